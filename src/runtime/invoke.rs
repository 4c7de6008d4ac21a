//! Managed invocation and raw value access.
//!
//! Everything here funnels through `mono_runtime_invoke` or the field
//! accessor exports. Managed exceptions never cross into the host: an
//! invocation that throws yields `None` and a log line.

use std::ffi::{c_void, CString};
use std::mem::MaybeUninit;
use std::ptr;

use super::{cstr_to_string, MonoRuntime};
use crate::handles::{
    ArrayHandle, ClassHandle, FieldHandle, FnAddr, MethodHandle, ObjectHandle, StringHandle,
    VTableHandle,
};

/// One invocation argument, passed exactly as the runtime expects it: a
/// pointer to the raw value for value types, the object pointer itself
/// for reference types.
pub type RawArg = *mut c_void;

impl MonoRuntime {
    /// Call a managed method.
    ///
    /// A thrown managed exception is swallowed: the call returns `None`
    /// and the exception is logged. Void methods also return `None`, so
    /// `None` alone does not distinguish failure from a void result.
    pub fn invoke(
        &self,
        method: MethodHandle,
        instance: Option<ObjectHandle>,
        args: &mut [RawArg],
    ) -> Option<ObjectHandle> {
        if !self.attach_current_thread() {
            return None;
        }

        let object = instance.map_or(ptr::null_mut(), ObjectHandle::as_ptr);
        let params = if args.is_empty() {
            ptr::null_mut()
        } else {
            args.as_mut_ptr()
        };

        let mut exception: *mut c_void = ptr::null_mut();
        let result = unsafe {
            (self.exports.runtime_invoke)(method.as_ptr(), object, params, &mut exception)
        };

        if !exception.is_null() {
            let name = self
                .method_name(method)
                .unwrap_or_else(|| "<unknown>".to_string());
            log::warn!("managed exception thrown by {}", name);
            return None;
        }
        ObjectHandle::from_raw(result)
    }

    /// Read the payload of a boxed value-type object.
    ///
    /// # Safety
    ///
    /// `T` must match the boxed payload's size and layout; a mismatch
    /// reads out of bounds.
    pub unsafe fn unbox<T: Copy>(&self, object: ObjectHandle) -> Option<T> {
        if !self.attach_current_thread() {
            return None;
        }
        let payload = (self.exports.object_unbox)(object.as_ptr());
        if payload.is_null() {
            return None;
        }
        Some(ptr::read(payload as *const T))
    }

    /// The class of a managed object.
    pub fn object_class(&self, object: ObjectHandle) -> Option<ClassHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        ClassHandle::from_raw(unsafe { (self.exports.object_get_class)(object.as_ptr()) })
    }

    /// Allocate a managed string in the root domain.
    pub fn create_string(&self, text: &str) -> Option<StringHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        let c_text = CString::new(text).ok()?;
        let string =
            unsafe { (self.exports.string_new)(self.domain.as_ptr(), c_text.as_ptr()) };
        StringHandle::from_raw(string)
    }

    /// Copy a managed string into a host `String`.
    ///
    /// The runtime's UTF-8 buffer is released through `mono_free` when the
    /// export exists. Failures come back as an empty string.
    pub fn string_to_utf8(&self, string: StringHandle) -> String {
        if !self.attach_current_thread() {
            return String::new();
        }
        let buffer = unsafe { (self.exports.string_to_utf8)(string.as_ptr()) };
        let text = match cstr_to_string(buffer) {
            Some(text) => text,
            None => return String::new(),
        };
        if let Some(free) = self.exports.free {
            unsafe { free(buffer as *mut c_void) };
        }
        text
    }

    /// The class vtable in the root domain, needed for static fields.
    pub fn class_vtable(&self, class: ClassHandle) -> Option<VTableHandle> {
        let vtable =
            unsafe { (self.exports.class_vtable)(self.domain.as_ptr(), class.as_ptr()) };
        VTableHandle::from_raw(vtable)
    }

    /// Read an instance field into a typed value.
    ///
    /// # Safety
    ///
    /// `T` must match the field's managed size and layout; the runtime
    /// writes the field's bytes into the out buffer unchecked.
    pub unsafe fn field_value<T: Copy>(
        &self,
        object: ObjectHandle,
        field: FieldHandle,
    ) -> Option<T> {
        if !self.attach_current_thread() {
            return None;
        }
        let mut value = MaybeUninit::<T>::uninit();
        (self.exports.field_get_value)(
            object.as_ptr(),
            field.as_ptr(),
            value.as_mut_ptr() as *mut c_void,
        );
        Some(value.assume_init())
    }

    /// Read a static field into a typed value.
    ///
    /// # Safety
    ///
    /// Same contract as [`MonoRuntime::field_value`].
    pub unsafe fn static_field_value<T: Copy>(
        &self,
        class: ClassHandle,
        field: FieldHandle,
    ) -> Option<T> {
        if !self.attach_current_thread() {
            return None;
        }
        let vtable = self.class_vtable(class)?;
        let mut value = MaybeUninit::<T>::uninit();
        (self.exports.field_static_get_value)(
            vtable.as_ptr(),
            field.as_ptr(),
            value.as_mut_ptr() as *mut c_void,
        );
        Some(value.assume_init())
    }

    /// Overwrite an instance field. Returns false when the runtime does
    /// not export field stores.
    ///
    /// # Safety
    ///
    /// `T` must match the field's managed size and layout; the runtime
    /// copies `size_of::<T>()` bytes into the object unchecked.
    pub unsafe fn set_field_value<T>(
        &self,
        object: ObjectHandle,
        field: FieldHandle,
        value: &T,
    ) -> bool {
        let set = match self.exports.field_set_value {
            Some(set) => set,
            None => {
                log::debug!("field store export is unavailable");
                return false;
            }
        };
        if !self.attach_current_thread() {
            return false;
        }
        set(
            object.as_ptr(),
            field.as_ptr(),
            value as *const T as *mut c_void,
        );
        true
    }

    /// Overwrite a static field. Returns false when the runtime does not
    /// export static field stores.
    ///
    /// # Safety
    ///
    /// Same contract as [`MonoRuntime::set_field_value`].
    pub unsafe fn set_static_field_value<T>(
        &self,
        class: ClassHandle,
        field: FieldHandle,
        value: &T,
    ) -> bool {
        let set = match self.exports.field_static_set_value {
            Some(set) => set,
            None => {
                log::debug!("static field store export is unavailable");
                return false;
            }
        };
        if !self.attach_current_thread() {
            return false;
        }
        let vtable = match self.class_vtable(class) {
            Some(vtable) => vtable,
            None => return false,
        };
        set(
            vtable.as_ptr(),
            field.as_ptr(),
            value as *const T as *mut c_void,
        );
        true
    }

    /// Allocate an uninitialized instance of `class`. The constructor is
    /// not run; invoke `.ctor` separately if the type needs it.
    pub fn new_object(&self, class: ClassHandle) -> Option<ObjectHandle> {
        let object_new = self.exports.object_new?;
        if !self.attach_current_thread() {
            return None;
        }
        let object = unsafe { object_new(self.domain.as_ptr(), class.as_ptr()) };
        ObjectHandle::from_raw(object)
    }

    /// Element count of a managed array, when the runtime exports it.
    pub fn array_length(&self, array: ArrayHandle) -> Option<usize> {
        let length = self.exports.array_length?;
        if !self.attach_current_thread() {
            return None;
        }
        Some(unsafe { length(array.as_ptr()) })
    }

    /// Native target of an `[InternalCall]` method, when the runtime
    /// exports the lookup.
    pub fn internal_call_pointer(&self, method: MethodHandle) -> Option<FnAddr> {
        let lookup = self.exports.lookup_internal_call?;
        if !self.attach_current_thread() {
            return None;
        }
        FnAddr::from_raw(unsafe { lookup(method.as_ptr()) })
    }

    /// Byte offset of a field within its object layout.
    pub fn field_offset(&self, field: FieldHandle) -> u32 {
        unsafe { (self.exports.field_get_offset)(field.as_ptr()) }
    }
}
