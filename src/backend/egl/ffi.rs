#![allow(missing_docs)]

use super::{EGLError, Error};
use std::os::raw::{c_char, c_long, c_void};

pub type khronos_utime_nanoseconds_t = khronos_uint64_t;
pub type khronos_uint64_t = u64;
pub type khronos_ssize_t = c_long;
pub type EGLint = i32;
pub type EGLchar = c_char;
pub type EGLLabelKHR = *const c_void;
pub type EGLNativeDisplayType = NativeDisplayType;
pub type EGLNativePixmapType = NativePixmapType;
pub type EGLNativeWindowType = NativeWindowType;
pub type NativeDisplayType = *const c_void;
pub type NativePixmapType = *const c_void;
pub type NativeWindowType = *const c_void;

extern "system" fn egl_debug_log(
    severity: egl::types::EGLenum,
    command: *const EGLchar,
    _id: EGLint,
    _thread: EGLLabelKHR,
    _obj: EGLLabelKHR,
    message: *const EGLchar,
) {
    let _ = std::panic::catch_unwind(move || unsafe {
        let msg = std::ffi::CStr::from_ptr(message);
        let message_utf8 = msg.to_string_lossy();
        let command_utf8 = if !command.is_null() {
            let cmd = std::ffi::CStr::from_ptr(command);
            cmd.to_string_lossy()
        } else {
            std::borrow::Cow::Borrowed("")
        };
        match severity {
            egl::DEBUG_MSG_CRITICAL_KHR | egl::DEBUG_MSG_ERROR_KHR => {
                tracing::error!(target: "backend_egl", "[EGL] {}: {}", command_utf8, message_utf8)
            }
            egl::DEBUG_MSG_WARN_KHR => {
                tracing::warn!(target: "backend_egl", "[EGL] {}: {}", command_utf8, message_utf8)
            }
            egl::DEBUG_MSG_INFO_KHR => {
                tracing::info!(target: "backend_egl", "[EGL] {}: {}", command_utf8, message_utf8)
            }
            _ => tracing::debug!(target: "backend_egl", "[EGL] {}: {}", command_utf8, message_utf8),
        };
    });
}

/// Returns the address of an EGL function, or null if the implementation does not know it.
///
/// The result is independent of displays and does not guarantee an extension is actually
/// supported at runtime.
pub unsafe fn get_proc_address(symbol: &str) -> *const c_void {
    let Ok(symbol) = std::ffi::CString::new(symbol) else {
        return std::ptr::null();
    };
    egl::GetProcAddress(symbol.as_ptr()) as *const c_void
}

/// Loads libEGL symbols, if not loaded already, and returns the client extension string.
pub fn make_sure_egl_is_loaded() -> Result<String, Error> {
    use std::{
        ffi::{CStr, CString},
        ptr,
    };

    let lib = egl::LIB
        .as_ref()
        .map_err(|err| Error::LibraryNotLoaded(err.to_string()))?;

    fn constrain<F>(f: F) -> F
    where
        F: for<'a> Fn(&'a str) -> *const c_void,
    {
        f
    }
    let proc_address = constrain(|sym| unsafe { get_proc_address(sym) });

    egl::LOAD.call_once(|| unsafe {
        egl::load_with(|sym| {
            let Ok(name) = CString::new(sym) else {
                return ptr::null();
            };
            match lib.get::<*mut c_void>(name.as_bytes()) {
                Ok(x) => *x as *const _,
                Err(_) => ptr::null(),
            }
        });
        egl::load_with(&proc_address);
        egl::DebugMessageControlKHR::load_with(&proc_address);
    });

    let extensions = unsafe {
        let p = super::wrap_egl_call(|| egl::QueryString(egl::NO_DISPLAY, egl::EXTENSIONS as i32))
            .map_err(Error::InitFailed)?;

        // client extensions need EGL 1.5 or EGL_EXT_client_extensions, otherwise
        // `eglQueryString` returns NULL for EGL_NO_DISPLAY
        if p.is_null() {
            return Err(Error::InitFailed(EGLError::BadDisplay));
        }
        CStr::from_ptr(p).to_string_lossy().into_owned()
    };

    egl::DEBUG.call_once(|| unsafe {
        if super::extensions::contains_extension(&extensions, "EGL_KHR_debug") {
            let debug_attribs = [
                egl::DEBUG_MSG_CRITICAL_KHR as isize,
                egl::TRUE as isize,
                egl::DEBUG_MSG_ERROR_KHR as isize,
                egl::TRUE as isize,
                egl::DEBUG_MSG_WARN_KHR as isize,
                egl::TRUE as isize,
                egl::DEBUG_MSG_INFO_KHR as isize,
                egl::TRUE as isize,
                egl::NONE as isize,
            ];
            // we do not check for success, because there is not much we can do otherwise.
            egl::DebugMessageControlKHR(Some(egl_debug_log), debug_attribs.as_ptr());
        }
    });

    Ok(extensions)
}

/// Module containing raw egl function bindings
#[allow(clippy::all, missing_debug_implementations)]
pub mod egl {
    use super::*;
    use libloading::Library;
    use std::sync::Once;

    lazy_static::lazy_static! {
        pub static ref LIB: Result<Library, libloading::Error> = unsafe { Library::new("libEGL.so.1") };
    }

    pub static LOAD: Once = Once::new();
    pub static DEBUG: Once = Once::new();

    include!(concat!(env!("OUT_DIR"), "/egl_bindings.rs"));

    type EGLDEBUGPROCKHR = Option<
        extern "system" fn(
            _error: egl::types::EGLenum,
            command: *const EGLchar,
            _id: EGLint,
            _thread: EGLLabelKHR,
            _obj: EGLLabelKHR,
            message: *const EGLchar,
        ),
    >;
    #[allow(dead_code, non_upper_case_globals)]
    pub const DEBUG_MSG_CRITICAL_KHR: types::EGLenum = 0x33B9;
    #[allow(dead_code, non_upper_case_globals)]
    pub const DEBUG_MSG_ERROR_KHR: types::EGLenum = 0x33BA;
    #[allow(dead_code, non_upper_case_globals)]
    pub const DEBUG_MSG_INFO_KHR: types::EGLenum = 0x33BC;
    #[allow(dead_code, non_upper_case_globals)]
    pub const DEBUG_MSG_WARN_KHR: types::EGLenum = 0x33BB;

    /*
     * `gl_generator` cannot generate bindings for `EGL_KHR_debug`, as the callback type
     * is missing from its registry. Lets do it ourselves...
     */

    #[allow(non_snake_case, unused_variables, dead_code)]
    #[inline]
    pub unsafe fn DebugMessageControlKHR(
        callback: EGLDEBUGPROCKHR,
        attrib_list: *const types::EGLAttrib,
    ) -> types::EGLint {
        __gl_imports::mem::transmute::<
            _,
            extern "system" fn(EGLDEBUGPROCKHR, *const types::EGLAttrib) -> types::EGLint,
        >(debug_storage::DebugMessageControlKHR.f)(callback, attrib_list)
    }

    mod debug_storage {
        use super::{FnPtr, __gl_imports::raw};
        pub static mut DebugMessageControlKHR: FnPtr = FnPtr {
            f: super::missing_fn_panic as *const raw::c_void,
            is_loaded: false,
        };
    }

    #[allow(non_snake_case)]
    pub mod DebugMessageControlKHR {
        use super::FnPtr;
        use super::__gl_imports::raw;
        use super::{debug_storage, metaloadfn};

        #[inline]
        #[allow(dead_code)]
        pub fn is_loaded() -> bool {
            unsafe { debug_storage::DebugMessageControlKHR.is_loaded }
        }

        #[allow(dead_code)]
        pub fn load_with<F>(mut loadfn: F)
        where
            F: FnMut(&'static str) -> *const raw::c_void,
        {
            unsafe {
                debug_storage::DebugMessageControlKHR =
                    FnPtr::new(metaloadfn(&mut loadfn, "eglDebugMessageControlKHR", &[]))
            }
        }
    }
}
