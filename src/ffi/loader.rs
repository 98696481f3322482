//! Dynamic library loading.
//!
//! Wraps `libloading` with the open modes of the platform loader and a
//! per-library cache of resolved symbol addresses.

use crate::error::{FfiError, FfiResult};
use crate::ffi::call::Function;
use crate::types::Type;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

/// When the loader resolves a library's undefined symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMode {
    /// On first use.
    Lazy,
    /// At open time.
    Eager,
}

/// Whether a library's symbols satisfy libraries loaded after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Global,
    Local,
}

/// Options for [`Library::open_with`]. Ignored on platforms whose loader has
/// no such modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenFlags {
    pub bind: BindMode,
    pub visibility: Visibility,
    /// Only succeed if the library is already loaded.
    pub no_load: bool,
    /// Keep the library mapped after the last close.
    pub no_delete: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        OpenFlags {
            bind: BindMode::Eager,
            visibility: Visibility::Local,
            no_load: false,
            no_delete: false,
        }
    }
}

impl OpenFlags {
    pub fn with_bind(mut self, bind: BindMode) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_no_load(mut self, no_load: bool) -> Self {
        self.no_load = no_load;
        self
    }

    pub fn with_no_delete(mut self, no_delete: bool) -> Self {
        self.no_delete = no_delete;
        self
    }

    #[cfg(unix)]
    fn as_raw(&self) -> std::os::raw::c_int {
        let mut flags = match self.bind {
            BindMode::Lazy => libc::RTLD_LAZY,
            BindMode::Eager => libc::RTLD_NOW,
        };
        flags |= match self.visibility {
            Visibility::Global => libc::RTLD_GLOBAL,
            Visibility::Local => libc::RTLD_LOCAL,
        };
        if self.no_load {
            flags |= libc::RTLD_NOLOAD;
        }
        if self.no_delete {
            flags |= libc::RTLD_NODELETE;
        }
        flags
    }
}

/// An opened native library.
pub(crate) struct Handle {
    path: String,
    native: libloading::Library,
}

impl Handle {
    fn open(path: &str, flags: OpenFlags) -> FfiResult<Handle> {
        #[cfg(unix)]
        let native = unsafe {
            libloading::os::unix::Library::open(Some(path), flags.as_raw())
                .map(libloading::Library::from)
        };
        #[cfg(not(unix))]
        let native = {
            debug!("open flags {:?} ignored on this platform", flags);
            unsafe { libloading::Library::new(path) }
        };
        let native = native.map_err(|e| FfiError::library(path, e.to_string()))?;
        debug!("opened library {} ({:?})", path, flags);
        Ok(Handle {
            path: path.to_string(),
            native,
        })
    }

    fn symbol(&self, name: &str) -> FfiResult<*mut c_void> {
        unsafe {
            self.native
                .get::<*mut c_void>(name.as_bytes())
                .map(|sym| *sym)
                .map_err(|e| FfiError::symbol(&self.path, name, e.to_string()))
        }
    }

    fn close(self) -> FfiResult<()> {
        let path = self.path;
        self.native
            .close()
            .map_err(|e| FfiError::library(&path, e.to_string()))?;
        debug!("closed library {}", path);
        Ok(())
    }
}

/// A native library whose functions can be bound and called.
///
/// Bound [`Function`]s keep the library loaded; [`Library::close`] only
/// unloads it once none remain.
pub struct Library {
    handle: Arc<Handle>,
    symbols: Mutex<FxHashMap<String, usize>>,
}

impl Library {
    /// Open with eager binding and local visibility.
    ///
    /// # Example
    /// ```ignore
    /// let libm = Library::open(dynffi::platform::LIBM)?;
    /// ```
    pub fn open(path: &str) -> FfiResult<Library> {
        Library::open_with(path, OpenFlags::default())
    }

    pub fn open_with(path: &str, flags: OpenFlags) -> FfiResult<Library> {
        Ok(Library {
            handle: Arc::new(Handle::open(path, flags)?),
            symbols: Mutex::new(FxHashMap::default()),
        })
    }

    pub fn path(&self) -> &str {
        &self.handle.path
    }

    /// Address of the symbol `name`.
    pub fn symbol(&self, name: &str) -> FfiResult<*mut c_void> {
        let mut symbols = self.symbols.lock();
        if let Some(addr) = symbols.get(name) {
            trace!("symbol cache hit for {}", name);
            return Ok(*addr as *mut c_void);
        }
        let addr = self.handle.symbol(name)?;
        debug!("resolved {} in {} at {:p}", name, self.handle.path, addr);
        symbols.insert(name.to_string(), addr as usize);
        Ok(addr)
    }

    /// Bind the function `name` with signature `ret(args...)`.
    ///
    /// # Returns
    /// * `Ok(function)` - ready to call
    /// * `Err(FfiError::Symbol)` - `name` is not exported
    /// * `Err(FfiError::Type)` - the engine rejected the signature
    ///
    /// # Safety
    /// The signature must match the native definition of `name`; calls
    /// through a mismatched signature are undefined behavior.
    pub unsafe fn function(&self, name: &str, ret: &Type, args: &[Type]) -> FfiResult<Function> {
        let addr = self.symbol(name)?;
        Function::bind(name, Arc::clone(&self.handle), addr, ret, args)
    }

    /// Unload the library. Deferred, with a warning, while functions bound
    /// from it are still alive.
    pub fn close(self) -> FfiResult<()> {
        match Arc::try_unwrap(self.handle) {
            Ok(handle) => handle.close(),
            Err(handle) => {
                warn!(
                    "close of {} deferred: {} bound functions still alive",
                    handle.path,
                    Arc::strong_count(&handle) - 1
                );
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("path", &self.handle.path)
            .finish()
    }
}
