//! Overload selection and native address resolution.
//!
//! Arity alone is ambiguous for overloaded methods, so `find_overload`
//! walks every method of the class and compares full signatures: return
//! type name plus each parameter type name, in order. The first match
//! wins.

use std::ffi::c_void;
use std::ptr;

use super::{cstr_to_string, MonoRuntime};
use crate::handles::{ClassHandle, FnAddr, MethodHandle, SignatureHandle, TypeHandle};

/// A full method signature, spelled with runtime type names such as
/// `System.Int32`.
#[derive(Debug, Clone, Copy)]
pub struct MethodSig<'a> {
    pub return_type: &'a str,
    pub param_types: &'a [&'a str],
}

impl MonoRuntime {
    /// Find the overload of `name` whose signature matches exactly.
    ///
    /// Methods are visited in runtime declaration order and the first
    /// match is returned, so ambiguous signatures resolve deterministically.
    pub fn find_overload(
        &self,
        class: ClassHandle,
        name: &str,
        signature: MethodSig<'_>,
    ) -> Option<MethodHandle> {
        let mut iter: *mut c_void = ptr::null_mut();
        loop {
            let method = unsafe { (self.exports.class_get_methods)(class.as_ptr(), &mut iter) };
            let method = match MethodHandle::from_raw(method) {
                Some(method) => method,
                None => break,
            };
            if self.method_name(method).as_deref() != Some(name) {
                continue;
            }
            if self.signature_matches(method, signature) {
                return Some(method);
            }
        }
        log::warn!("no overload of {} matches {:?}", name, signature);
        None
    }

    fn signature_matches(&self, method: MethodHandle, signature: MethodSig<'_>) -> bool {
        let sig = match SignatureHandle::from_raw(unsafe {
            (self.exports.method_signature)(method.as_ptr())
        }) {
            Some(sig) => sig,
            None => return false,
        };

        let param_count = unsafe { (self.exports.signature_get_param_count)(sig.as_ptr()) };
        if param_count as usize != signature.param_types.len() {
            return false;
        }

        let return_type =
            TypeHandle::from_raw(unsafe { (self.exports.signature_get_return_type)(sig.as_ptr()) });
        match return_type.and_then(|ty| self.type_name(ty)) {
            Some(name) if name == signature.return_type => {}
            _ => return false,
        }

        let mut iter: *mut c_void = ptr::null_mut();
        for expected in signature.param_types {
            let param = unsafe { (self.exports.signature_get_params)(sig.as_ptr(), &mut iter) };
            let name = TypeHandle::from_raw(param).and_then(|ty| self.type_name(ty));
            if name.as_deref() != Some(*expected) {
                return false;
            }
        }
        true
    }

    /// The method's simple name.
    pub fn method_name(&self, method: MethodHandle) -> Option<String> {
        cstr_to_string(unsafe { (self.exports.method_get_name)(method.as_ptr()) })
    }

    /// The type's full name, e.g. `System.Single`.
    ///
    /// The runtime allocates the returned buffer; it is copied and the
    /// original leaks. Name lookups are rare enough that reclaiming them
    /// is not worth depending on the runtime's allocator contract.
    pub fn type_name(&self, ty: TypeHandle) -> Option<String> {
        cstr_to_string(unsafe { (self.exports.type_get_name)(ty.as_ptr()) })
    }

    /// JIT-compile a method and return its native entry point.
    pub fn compile_method(&self, method: MethodHandle) -> Option<FnAddr> {
        if !self.attach_current_thread() {
            return None;
        }
        let address = unsafe { (self.exports.compile_method)(method.as_ptr()) };
        let address = FnAddr::from_raw(address);
        if address.is_none() {
            log::warn!("method compilation returned no native address");
        }
        address
    }

    /// Resolve a method all the way to its native address.
    ///
    /// With a signature the overload walk picks the exact method; without
    /// one, name plus arity must be unambiguous. `param_count` is ignored
    /// when a signature is given since the signature fixes the arity.
    pub fn native_address(
        &self,
        assembly: &str,
        namespace: &str,
        class: &str,
        method: &str,
        param_count: i32,
        signature: Option<MethodSig<'_>>,
    ) -> Option<FnAddr> {
        let class = self.get_class(assembly, namespace, class)?;
        let method = match signature {
            Some(signature) => self.find_overload(class, method, signature)?,
            None => self.get_method(class, method, param_count)?,
        };
        self.compile_method(method)
    }
}
