//! Opaque handles for runtime-owned objects.
//!
//! The managed runtime hands out raw pointers for domains, classes, methods
//! and so on. Each kind gets its own newtype so a method handle can never be
//! passed where a class handle is expected. Handles are plain addresses:
//! copying one never copies the underlying runtime object, and equality is
//! pointer equality.

use std::ffi::c_void;
use std::ptr::NonNull;

macro_rules! runtime_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonNull<c_void>);

        impl $name {
            /// Wrap a raw runtime pointer, mapping null to `None`.
            pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            /// The raw pointer for passing back across the C boundary.
            pub fn as_ptr(self) -> *mut c_void {
                self.0.as_ptr()
            }
        }

        // Safety: a handle is an address inside the runtime's own heap. The
        // runtime keeps the object alive independently of which of our
        // threads holds the address, so moving or sharing the handle between
        // threads is fine.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}
    };
}

runtime_handle!(
    /// The runtime's root application domain.
    DomainHandle
);
runtime_handle!(
    /// A loaded assembly.
    AssemblyHandle
);
runtime_handle!(
    /// The metadata image behind an assembly.
    ImageHandle
);
runtime_handle!(
    /// A managed class.
    ClassHandle
);
runtime_handle!(
    /// A managed method.
    MethodHandle
);
runtime_handle!(
    /// A field descriptor on a class.
    FieldHandle
);
runtime_handle!(
    /// A property descriptor on a class.
    PropertyHandle
);
runtime_handle!(
    /// A managed object reference.
    ObjectHandle
);
runtime_handle!(
    /// A managed string object.
    StringHandle
);
runtime_handle!(
    /// A managed array object.
    ArrayHandle
);
runtime_handle!(
    /// The runtime's token for an attached native thread.
    ThreadHandle
);
runtime_handle!(
    /// A class vtable inside a specific domain.
    VTableHandle
);
runtime_handle!(
    /// A method signature descriptor.
    SignatureHandle
);
runtime_handle!(
    /// A type reference inside a signature.
    TypeHandle
);
runtime_handle!(
    /// The address of native executable code, either a jit-compiled method
    /// entry point or a raw export. Used as hook targets, detours and
    /// trampolines.
    FnAddr
);
