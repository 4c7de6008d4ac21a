//! Typed bindings for the runtime's C export table.
//!
//! The runtime exposes a flat C API. Every function the engine calls is
//! declared once in the `export_set!` table below, split into the exports the
//! engine cannot live without and the ones it degrades gracefully around.
//! Resolution happens exactly once, during initialization.

use std::ffi::c_void;
use std::mem;
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;

use crate::error::EngineError;
use crate::symbols::SymbolSource;

// Callback shape for the assembly enumeration export.
pub type AssemblyIterFn = unsafe extern "C" fn(assembly: *mut c_void, user_data: *mut c_void);

pub type GetRootDomainFn = unsafe extern "C" fn() -> *mut c_void;
pub type DomainAssemblyForeachFn =
    unsafe extern "C" fn(domain: *mut c_void, func: AssemblyIterFn, user_data: *mut c_void);
pub type AssemblyGetImageFn = unsafe extern "C" fn(assembly: *mut c_void) -> *mut c_void;
pub type ImageGetNameFn = unsafe extern "C" fn(image: *mut c_void) -> *const c_char;
pub type ClassFromNameFn = unsafe extern "C" fn(
    image: *mut c_void,
    namespace: *const c_char,
    name: *const c_char,
) -> *mut c_void;
pub type MethodFromNameFn = unsafe extern "C" fn(
    class: *mut c_void,
    name: *const c_char,
    param_count: c_int,
) -> *mut c_void;
pub type RuntimeInvokeFn = unsafe extern "C" fn(
    method: *mut c_void,
    object: *mut c_void,
    params: *mut *mut c_void,
    exception: *mut *mut c_void,
) -> *mut c_void;
pub type FieldFromNameFn =
    unsafe extern "C" fn(class: *mut c_void, name: *const c_char) -> *mut c_void;
pub type FieldGetValueFn =
    unsafe extern "C" fn(object: *mut c_void, field: *mut c_void, value: *mut c_void);
pub type FieldStaticGetValueFn =
    unsafe extern "C" fn(vtable: *mut c_void, field: *mut c_void, value: *mut c_void);
pub type StringNewFn =
    unsafe extern "C" fn(domain: *mut c_void, text: *const c_char) -> *mut c_void;
pub type StringToUtf8Fn = unsafe extern "C" fn(string: *mut c_void) -> *mut c_char;
pub type ThreadAttachFn = unsafe extern "C" fn(domain: *mut c_void) -> *mut c_void;
pub type ClassVtableFn =
    unsafe extern "C" fn(domain: *mut c_void, class: *mut c_void) -> *mut c_void;
pub type ObjectGetClassFn = unsafe extern "C" fn(object: *mut c_void) -> *mut c_void;
pub type CompileMethodFn = unsafe extern "C" fn(method: *mut c_void) -> *mut c_void;
pub type ClassGetMethodsFn =
    unsafe extern "C" fn(class: *mut c_void, iter: *mut *mut c_void) -> *mut c_void;
pub type MethodGetNameFn = unsafe extern "C" fn(method: *mut c_void) -> *const c_char;
pub type MethodSignatureFn = unsafe extern "C" fn(method: *mut c_void) -> *mut c_void;
pub type SignatureParamCountFn = unsafe extern "C" fn(signature: *mut c_void) -> u32;
pub type SignatureReturnTypeFn = unsafe extern "C" fn(signature: *mut c_void) -> *mut c_void;
pub type TypeGetNameFn = unsafe extern "C" fn(ty: *mut c_void) -> *mut c_char;
pub type SignatureParamsFn =
    unsafe extern "C" fn(signature: *mut c_void, iter: *mut *mut c_void) -> *mut c_void;
pub type ObjectUnboxFn = unsafe extern "C" fn(object: *mut c_void) -> *mut c_void;
pub type FieldGetOffsetFn = unsafe extern "C" fn(field: *mut c_void) -> u32;
pub type ClassGetFieldsFn =
    unsafe extern "C" fn(class: *mut c_void, iter: *mut *mut c_void) -> *mut c_void;
pub type FieldGetNameFn = unsafe extern "C" fn(field: *mut c_void) -> *const c_char;

pub type FreeFn = unsafe extern "C" fn(ptr: *mut c_void);
pub type ThreadDetachFn = unsafe extern "C" fn(thread: *mut c_void);
pub type ArrayLengthFn = unsafe extern "C" fn(array: *mut c_void) -> usize;
pub type LookupInternalCallFn = unsafe extern "C" fn(method: *mut c_void) -> *mut c_void;
pub type PropertyFromNameFn =
    unsafe extern "C" fn(class: *mut c_void, name: *const c_char) -> *mut c_void;
pub type PropertyGetMethodFn = unsafe extern "C" fn(property: *mut c_void) -> *mut c_void;
pub type ClassGetNameFn = unsafe extern "C" fn(class: *mut c_void) -> *const c_char;
pub type ClassGetNestedTypesFn =
    unsafe extern "C" fn(class: *mut c_void, iter: *mut *mut c_void) -> *mut c_void;
pub type ObjectNewFn =
    unsafe extern "C" fn(domain: *mut c_void, class: *mut c_void) -> *mut c_void;
pub type FieldSetValueFn =
    unsafe extern "C" fn(object: *mut c_void, field: *mut c_void, value: *mut c_void);
pub type FieldStaticSetValueFn =
    unsafe extern "C" fn(vtable: *mut c_void, field: *mut c_void, value: *mut c_void);

/// Reinterpret a resolved symbol address as a typed C function pointer.
unsafe fn fn_from_addr<F>(address: NonNull<c_void>) -> F {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
    let raw = address.as_ptr();
    mem::transmute_copy(&raw)
}

macro_rules! export_set {
    (
        required { $($req_field:ident : $req_ty:ty = $req_sym:literal,)+ }
        optional { $($opt_field:ident : $opt_ty:ty = $opt_sym:literal,)+ }
    ) => {
        /// The resolved export table.
        ///
        /// Required entries are plain function pointers; optional entries
        /// stay `None` when the module does not export them and the features
        /// built on them degrade instead of failing.
        #[derive(Debug, Clone, Copy)]
        pub struct ExportSet {
            $(pub $req_field: $req_ty,)+
            $(pub $opt_field: Option<$opt_ty>,)+
        }

        impl ExportSet {
            /// Resolve the whole table through `source`.
            ///
            /// The first missing required export aborts resolution; missing
            /// optional exports are logged and recorded as absent.
            pub fn resolve(source: &dyn SymbolSource) -> Result<Self, EngineError> {
                $(
                    let $req_field: $req_ty = match source.resolve($req_sym) {
                        Some(address) => unsafe { fn_from_addr(address) },
                        None => {
                            log::error!("required runtime export `{}` not found", $req_sym);
                            return Err(EngineError::MissingExport($req_sym));
                        }
                    };
                )+
                $(
                    let $opt_field: Option<$opt_ty> = match source.resolve($opt_sym) {
                        Some(address) => Some(unsafe { fn_from_addr(address) }),
                        None => {
                            log::warn!("optional runtime export `{}` not found", $opt_sym);
                            None
                        }
                    };
                )+
                Ok(ExportSet {
                    $($req_field,)+
                    $($opt_field,)+
                })
            }
        }
    };
}

export_set! {
    required {
        get_root_domain: GetRootDomainFn = "mono_get_root_domain",
        domain_assembly_foreach: DomainAssemblyForeachFn = "mono_domain_assembly_foreach",
        assembly_get_image: AssemblyGetImageFn = "mono_assembly_get_image",
        image_get_name: ImageGetNameFn = "mono_image_get_name",
        class_from_name: ClassFromNameFn = "mono_class_from_name",
        class_get_method_from_name: MethodFromNameFn = "mono_class_get_method_from_name",
        runtime_invoke: RuntimeInvokeFn = "mono_runtime_invoke",
        class_get_field_from_name: FieldFromNameFn = "mono_class_get_field_from_name",
        field_get_value: FieldGetValueFn = "mono_field_get_value",
        field_static_get_value: FieldStaticGetValueFn = "mono_field_static_get_value",
        string_new: StringNewFn = "mono_string_new",
        string_to_utf8: StringToUtf8Fn = "mono_string_to_utf8",
        thread_attach: ThreadAttachFn = "mono_thread_attach",
        class_vtable: ClassVtableFn = "mono_class_vtable",
        object_get_class: ObjectGetClassFn = "mono_object_get_class",
        compile_method: CompileMethodFn = "mono_compile_method",
        class_get_methods: ClassGetMethodsFn = "mono_class_get_methods",
        method_get_name: MethodGetNameFn = "mono_method_get_name",
        method_signature: MethodSignatureFn = "mono_method_signature",
        signature_get_param_count: SignatureParamCountFn = "mono_signature_get_param_count",
        signature_get_return_type: SignatureReturnTypeFn = "mono_signature_get_return_type",
        type_get_name: TypeGetNameFn = "mono_type_get_name",
        signature_get_params: SignatureParamsFn = "mono_signature_get_params",
        object_unbox: ObjectUnboxFn = "mono_object_unbox",
        field_get_offset: FieldGetOffsetFn = "mono_field_get_offset",
        class_get_fields: ClassGetFieldsFn = "mono_class_get_fields",
        field_get_name: FieldGetNameFn = "mono_field_get_name",
    }
    optional {
        free: FreeFn = "mono_free",
        thread_detach: ThreadDetachFn = "mono_thread_detach",
        array_length: ArrayLengthFn = "mono_array_length",
        lookup_internal_call: LookupInternalCallFn = "mono_lookup_internal_call",
        class_get_property_from_name: PropertyFromNameFn = "mono_class_get_property_from_name",
        property_get_get_method: PropertyGetMethodFn = "mono_property_get_get_method",
        property_get_set_method: PropertyGetMethodFn = "mono_property_get_set_method",
        class_get_name: ClassGetNameFn = "mono_class_get_name",
        class_get_nested_types: ClassGetNestedTypesFn = "mono_class_get_nested_types",
        object_new: ObjectNewFn = "mono_object_new",
        field_set_value: FieldSetValueFn = "mono_field_set_value",
        field_static_set_value: FieldStaticSetValueFn = "mono_field_static_set_value",
    }
}
