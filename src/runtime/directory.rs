//! Image, class and member lookups.
//!
//! Classes resolve through a `namespace::Name` cache; nested classes use
//! the `Outer+Inner` spelling and are walked through the enclosing class.

use std::ffi::{c_void, CString};
use std::ptr;

use super::{cstr_to_string, read_lock, write_lock, MonoRuntime};
use crate::handles::{ClassHandle, FieldHandle, ImageHandle, MethodHandle, PropertyHandle};

/// A field together with the metadata needed to read it.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub handle: FieldHandle,
    pub offset: u32,
}

impl MonoRuntime {
    /// Look up a cached assembly image by name.
    pub fn get_image(&self, assembly: &str) -> Option<ImageHandle> {
        let image = read_lock(&self.images).get(assembly).copied();
        if image.is_none() {
            log::warn!("assembly image {} is not loaded", assembly);
        }
        image
    }

    /// Names of every cached image, sorted for stable output.
    pub fn image_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read_lock(&self.images).keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a class, preferring the cache.
    ///
    /// The cache key is `namespace::Name`; the assembly only matters on the
    /// first resolution. `Outer+Inner` names resolve the outer class first
    /// and then walk its nested types.
    pub fn get_class(&self, assembly: &str, namespace: &str, name: &str) -> Option<ClassHandle> {
        let key = format!("{}::{}", namespace, name);
        if let Some(class) = read_lock(&self.classes).get(&key).copied() {
            return Some(class);
        }

        if !self.attach_current_thread() {
            return None;
        }

        let class = match name.split_once('+') {
            Some((outer, nested)) => {
                let outer = self.lookup_class(assembly, namespace, outer)?;
                self.resolve_nested_class(outer, nested)?
            }
            None => self.lookup_class(assembly, namespace, name)?,
        };

        write_lock(&self.classes).insert(key, class);
        Some(class)
    }

    fn lookup_class(&self, assembly: &str, namespace: &str, name: &str) -> Option<ClassHandle> {
        let image = self.get_image(assembly)?;
        let c_namespace = CString::new(namespace).ok()?;
        let c_name = CString::new(name).ok()?;
        let class = unsafe {
            (self.exports.class_from_name)(image.as_ptr(), c_namespace.as_ptr(), c_name.as_ptr())
        };
        let class = ClassHandle::from_raw(class);
        if class.is_none() {
            log::warn!("class {}.{} not found in {}", namespace, name, assembly);
        }
        class
    }

    /// Walk the nested types of `outer` looking for `name`.
    fn resolve_nested_class(&self, outer: ClassHandle, name: &str) -> Option<ClassHandle> {
        let nested_types = self.exports.class_get_nested_types?;
        let class_get_name = self.exports.class_get_name?;

        let mut iter: *mut c_void = ptr::null_mut();
        loop {
            let nested = unsafe { nested_types(outer.as_ptr(), &mut iter) };
            let nested = match ClassHandle::from_raw(nested) {
                Some(nested) => nested,
                None => break,
            };
            let nested_name = cstr_to_string(unsafe { class_get_name(nested.as_ptr()) });
            if nested_name.as_deref() == Some(name) {
                return Some(nested);
            }
        }
        log::warn!("nested class {} not found", name);
        None
    }

    /// Resolve a method by name and arity. `param_count` of -1 matches any
    /// arity; overload selection beyond arity lives in `find_overload`.
    pub fn get_method(
        &self,
        class: ClassHandle,
        name: &str,
        param_count: i32,
    ) -> Option<MethodHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        let c_name = CString::new(name).ok()?;
        let method = unsafe {
            (self.exports.class_get_method_from_name)(class.as_ptr(), c_name.as_ptr(), param_count)
        };
        let method = MethodHandle::from_raw(method);
        if method.is_none() {
            log::warn!("method {} (arity {}) not found", name, param_count);
        }
        method
    }

    /// Resolve a field by name.
    pub fn get_field(&self, class: ClassHandle, name: &str) -> Option<FieldHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        let c_name = CString::new(name).ok()?;
        let field =
            unsafe { (self.exports.class_get_field_from_name)(class.as_ptr(), c_name.as_ptr()) };
        let field = FieldHandle::from_raw(field);
        if field.is_none() {
            log::warn!("field {} not found", name);
        }
        field
    }

    /// Resolve a property by name, when the runtime exports property
    /// lookups at all.
    pub fn get_property(&self, class: ClassHandle, name: &str) -> Option<PropertyHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        let lookup = match self.exports.class_get_property_from_name {
            Some(lookup) => lookup,
            None => {
                log::debug!("property lookup export is unavailable");
                return None;
            }
        };
        let c_name = CString::new(name).ok()?;
        let property = unsafe { lookup(class.as_ptr(), c_name.as_ptr()) };
        let property = PropertyHandle::from_raw(property);
        if property.is_none() {
            log::warn!("property {} not found", name);
        }
        property
    }

    /// The property's getter method.
    pub fn property_getter(&self, property: PropertyHandle) -> Option<MethodHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        let getter = self.exports.property_get_get_method?;
        MethodHandle::from_raw(unsafe { getter(property.as_ptr()) })
    }

    /// The property's setter method.
    pub fn property_setter(&self, property: PropertyHandle) -> Option<MethodHandle> {
        if !self.attach_current_thread() {
            return None;
        }
        let setter = self.exports.property_get_set_method?;
        MethodHandle::from_raw(unsafe { setter(property.as_ptr()) })
    }

    /// Every field declared on the class, in declaration order.
    pub fn class_fields(&self, class: ClassHandle) -> Vec<FieldInfo> {
        let mut fields = Vec::new();
        let mut iter: *mut c_void = ptr::null_mut();
        loop {
            let field = unsafe { (self.exports.class_get_fields)(class.as_ptr(), &mut iter) };
            let field = match FieldHandle::from_raw(field) {
                Some(field) => field,
                None => break,
            };
            let name =
                match cstr_to_string(unsafe { (self.exports.field_get_name)(field.as_ptr()) }) {
                    Some(name) => name,
                    None => continue,
                };
            let offset = unsafe { (self.exports.field_get_offset)(field.as_ptr()) };
            fields.push(FieldInfo {
                name,
                handle: field,
                offset,
            });
        }
        fields
    }
}
