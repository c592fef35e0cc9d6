#[cfg(feature = "backend_egl")]
fn gl_generate() {
    use gl_generator::{Api, Fallbacks, Profile, Registry};
    use std::{env, fs::File, path::PathBuf};

    let dest = PathBuf::from(&env::var("OUT_DIR").unwrap());

    let mut file = File::create(dest.join("egl_bindings.rs")).unwrap();
    Registry::new(
        Api::Egl,
        (1, 5),
        Profile::Core,
        Fallbacks::All,
        [
            "EGL_EXT_device_base",
            "EGL_EXT_device_enumeration",
            "EGL_EXT_device_query",
            "EGL_EXT_device_drm",
            "EGL_EXT_platform_base",
            "EGL_EXT_platform_device",
            "EGL_EXT_output_base",
            "EGL_EXT_output_drm",
            "EGL_KHR_stream",
            "EGL_EXT_stream_consumer_egloutput",
            "EGL_KHR_stream_producer_eglsurface",
        ],
    )
    .write_bindings(gl_generator::GlobalGenerator, &mut file)
    .unwrap();
}

fn main() {
    #[cfg(feature = "backend_egl")]
    gl_generate();
}
