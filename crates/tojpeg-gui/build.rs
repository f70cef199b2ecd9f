#[cfg(target_os = "windows")]
fn main() {
    use std::path::Path;

    println!("cargo:rerun-if-changed=assets/icon.ico");

    let mut res = winres::WindowsResource::new();

    if Path::new("assets/icon.ico").exists() {
        res.set_icon("assets/icon.ico");
    }

    res.set("ProductName", "tojpeg");
    res.set("FileDescription", "Batch image to JPEG converter");
    res.set("ProductVersion", env!("CARGO_PKG_VERSION"));

    if let Err(e) = res.compile() {
        println!("cargo:warning=Failed to embed Windows resources: {e}");
    }
}

#[cfg(not(target_os = "windows"))]
fn main() {
    // No-op on other platforms
}
