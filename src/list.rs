//! Proxy for managed `List<string>` instances.
//!
//! The proxy resolves the list's own class and member methods once, then
//! drives every operation through managed invocation. A proxy built from
//! `None` is inert: reads return nothing and writes report failure.

use crate::handles::{ClassHandle, MethodHandle, ObjectHandle, StringHandle};
use crate::runtime::{MonoRuntime, RawArg};

pub struct ManagedList<'vm> {
    vm: &'vm MonoRuntime,
    object: Option<ObjectHandle>,
    class: Option<ClassHandle>,
    get_item: Option<MethodHandle>,
    add: Option<MethodHandle>,
    remove: Option<MethodHandle>,
    clear: Option<MethodHandle>,
    count_getter: Option<MethodHandle>,
    count: i32,
}

impl<'vm> ManagedList<'vm> {
    /// Wrap a managed list object. `None` yields an inert proxy.
    pub fn new(vm: &'vm MonoRuntime, object: Option<ObjectHandle>) -> Self {
        let class = object.and_then(|object| vm.object_class(object));

        let get_item = class.and_then(|class| vm.get_method(class, "get_Item", 1));
        let add = class.and_then(|class| vm.get_method(class, "Add", 1));
        let remove = class.and_then(|class| vm.get_method(class, "Remove", 1));
        let clear = class.and_then(|class| vm.get_method(class, "Clear", 0));

        // Prefer the property metadata for Count, fall back to the
        // compiler-generated getter name.
        let count_getter = class.and_then(|class| {
            vm.get_property(class, "Count")
                .and_then(|property| vm.property_getter(property))
                .or_else(|| vm.get_method(class, "get_Count", 0))
        });

        if object.is_some() && get_item.is_none() {
            log::warn!("object does not expose a list surface");
        }

        let mut list = ManagedList {
            vm,
            object,
            class,
            get_item,
            add,
            remove,
            clear,
            count_getter,
            count: 0,
        };
        list.update_count();
        list
    }

    /// True when the proxy wraps a live list.
    pub fn is_valid(&self) -> bool {
        self.object.is_some() && self.get_item.is_some()
    }

    /// The wrapped object, if any.
    pub fn object(&self) -> Option<ObjectHandle> {
        self.object
    }

    // A failed read keeps the previous cached count.
    fn update_count(&mut self) {
        if let Some(count) = self.read_count() {
            self.count = count;
        }
    }

    fn read_count(&self) -> Option<i32> {
        let object = self.object?;
        let getter = self.count_getter?;
        let boxed = self.vm.invoke(getter, Some(object), &mut [])?;
        unsafe { self.vm.unbox::<i32>(boxed) }
    }

    /// Refresh and return the element count.
    pub fn count(&mut self) -> i32 {
        self.update_count();
        self.count
    }

    /// Read the element at `index`, bounds-checked against the cached
    /// count.
    pub fn get_item(&self, index: i32) -> Option<String> {
        let object = self.object?;
        let get_item = self.get_item?;
        if index < 0 || index >= self.count {
            return None;
        }
        let mut index = index;
        let mut args: [RawArg; 1] = [&mut index as *mut i32 as RawArg];
        let item = self.vm.invoke(get_item, Some(object), &mut args)?;
        let string = StringHandle::from_raw(item.as_ptr())?;
        Some(self.vm.string_to_utf8(string))
    }

    /// Append a string. The managed `Add` returns void, so success means
    /// the call went through without throwing.
    pub fn add_item(&mut self, value: &str) -> bool {
        let object = match self.object {
            Some(object) => object,
            None => return false,
        };
        let add = match self.add {
            Some(add) => add,
            None => return false,
        };
        let string = match self.vm.create_string(value) {
            Some(string) => string,
            None => return false,
        };
        let mut args: [RawArg; 1] = [string.as_ptr()];
        self.vm.invoke(add, Some(object), &mut args);
        self.update_count();
        true
    }

    /// Remove the first occurrence of `value`. Mirrors the managed
    /// `Remove` result.
    pub fn remove_item(&mut self, value: &str) -> bool {
        let object = match self.object {
            Some(object) => object,
            None => return false,
        };
        let remove = match self.remove {
            Some(remove) => remove,
            None => return false,
        };
        let string = match self.vm.create_string(value) {
            Some(string) => string,
            None => return false,
        };
        let mut args: [RawArg; 1] = [string.as_ptr()];
        let removed = self
            .vm
            .invoke(remove, Some(object), &mut args)
            .and_then(|boxed| unsafe { self.vm.unbox::<bool>(boxed) })
            .unwrap_or(false);
        if removed {
            self.update_count();
        }
        removed
    }

    /// Membership test. `Contains` is resolved per call since it is the
    /// one member the proxy rarely needs.
    pub fn contains(&self, value: &str) -> bool {
        let object = match self.object {
            Some(object) => object,
            None => return false,
        };
        let contains = match self
            .class
            .and_then(|class| self.vm.get_method(class, "Contains", 1))
        {
            Some(contains) => contains,
            None => return false,
        };
        let string = match self.vm.create_string(value) {
            Some(string) => string,
            None => return false,
        };
        let mut args: [RawArg; 1] = [string.as_ptr()];
        self.vm
            .invoke(contains, Some(object), &mut args)
            .and_then(|boxed| unsafe { self.vm.unbox::<bool>(boxed) })
            .unwrap_or(false)
    }

    /// Empty the list. A proxy whose class never resolved `Clear` keeps
    /// both its contents and its cached count.
    pub fn clear(&mut self) {
        let (object, clear) = match (self.object, self.clear) {
            (Some(object), Some(clear)) => (object, clear),
            _ => return,
        };
        self.vm.invoke(clear, Some(object), &mut []);
        // The call emptied the managed side; no re-query needed.
        self.count = 0;
    }

    /// Snapshot every element in order.
    pub fn all_items(&mut self) -> Vec<String> {
        self.update_count();
        let mut items = Vec::with_capacity(self.count as usize);
        for index in 0..self.count {
            match self.get_item(index) {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }

    /// Replace the whole contents with `items`. Clearing and re-adding
    /// are separate managed calls, so readers on other threads may see
    /// the intermediate state.
    pub fn replace_all(&mut self, items: &[&str]) -> bool {
        if self.object.is_none() || self.clear.is_none() || self.add.is_none() {
            return false;
        }
        self.clear();
        for item in items {
            self.add_item(item);
        }
        true
    }
}
