// Build script: extra system libraries needed by the static FFmpeg capture backend
fn main() {
    // Only the Windows MSVC toolchain needs these for dshow capture
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // Intel QSV runtime pulled in by the vcpkg FFmpeg build
        println!("cargo:rustc-link-lib=dylib=libmfx");

        // DirectShow device enumeration
        println!("cargo:rustc-link-lib=dylib=strmiids");

        // OLE automation and VFW
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Secure Channel (TLS/SSL)
        println!("cargo:rustc-link-lib=dylib=secur32");
    }
}
