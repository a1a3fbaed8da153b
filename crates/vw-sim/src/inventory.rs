//! The simulated containment hierarchy.
//!
//! An [`Inventory`] holds folders, datacenters and virtual machines, linked
//! the way the managed platform links them: a folder lists its children in
//! `childEntity`, a datacenter points at its VM folder through `vmFolder`.
//! Selection graphs are evaluated against these links server-side, with a
//! visited set, so cyclic graphs terminate here rather than in the client.
//!
//! ```text
//! group-d1 (root Folder)
//!   ├─ datacenter-2 ──vmFolder──► group-v3 (Folder "vm")
//!   │                               ├─ vm-4
//!   │                               └─ group-v5 (Folder "prod")
//!   │                                    └─ vm-6
//!   └─ group-v7 (Folder)
//!        └─ datacenter-8 ──vmFolder──► ...
//! ```

use std::collections::BTreeMap;

use serde_json::{Value, json};
use vw_core::{
    CHILD_ENTITY, DATACENTER, FOLDER, FxHashMap, FxHashSet, ObjectReference, PropertySpec, SUMMARY,
    VIRTUAL_MACHINE, VM_FOLDER, fx_hash_map, fx_hash_set,
};
use vw_watcher::{FilterSpecification, NodeId};

use crate::error::SimError;

/// Reported property values of one object, keyed by property path.
pub type PropertyValues = BTreeMap<String, Value>;

/// Identifier of the root folder.
pub const ROOT_FOLDER_ID: &str = "group-d1";

/// One managed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    /// The object's reference.
    pub obj: ObjectReference,

    /// Display name.
    pub name: String,

    /// Containing object. `None` only for the root folder.
    pub parent: Option<ObjectReference>,

    links: BTreeMap<String, Vec<ObjectReference>>,
    properties: PropertyValues,
}

impl ManagedObject {
    fn new(obj: ObjectReference, name: &str, parent: Option<ObjectReference>) -> Self {
        let mut properties = PropertyValues::new();
        properties.insert("name".to_owned(), Value::String(name.to_owned()));
        Self {
            obj,
            name: name.to_owned(),
            parent,
            links: BTreeMap::new(),
            properties,
        }
    }

    /// Returns the value of property `path`.
    #[must_use]
    pub fn property(&self, path: &str) -> Option<&Value> {
        self.properties.get(path)
    }

    /// Returns the objects linked through `path`, in order.
    #[must_use]
    pub fn links(&self, path: &str) -> &[ObjectReference] {
        self.links.get(path).map_or(&[], Vec::as_slice)
    }
}

/// A mutable model of the inventory tree.
#[derive(Debug, Clone)]
pub struct Inventory {
    root: ObjectReference,
    objects: FxHashMap<ObjectReference, ManagedObject>,
    next_id: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    /// Creates an inventory holding only the root folder.
    #[must_use]
    pub fn new() -> Self {
        let root = ObjectReference::folder(ROOT_FOLDER_ID);
        let mut objects = fx_hash_map();
        objects.insert(root.clone(), ManagedObject::new(root.clone(), "Datacenters", None));
        Self {
            root,
            objects,
            next_id: 2,
        }
    }

    /// The root folder.
    #[must_use]
    pub const fn root(&self) -> &ObjectReference {
        &self.root
    }

    /// Looks up an object.
    #[must_use]
    pub fn get(&self, obj: &ObjectReference) -> Option<&ManagedObject> {
        self.objects.get(obj)
    }

    /// Returns `true` if `obj` exists.
    #[must_use]
    pub fn contains(&self, obj: &ObjectReference) -> bool {
        self.objects.contains_key(obj)
    }

    /// Number of objects, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Always `false`: the root folder cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns every object of `kind`, ordered by reference.
    #[must_use]
    pub fn objects_of(&self, kind: &str) -> Vec<ObjectReference> {
        let mut found: Vec<ObjectReference> = self.objects.keys().filter(|obj| obj.is_a(kind)).cloned().collect();
        found.sort();
        found
    }

    /// Finds the first object of `kind` called `name`, by reference order.
    #[must_use]
    pub fn find(&self, kind: &str, name: &str) -> Option<ObjectReference> {
        self.objects_of(kind)
            .into_iter()
            .find(|obj| self.objects.get(obj).is_some_and(|o| o.name == name))
    }

    /// Returns the VM folder of `datacenter`.
    #[must_use]
    pub fn vm_folder(&self, datacenter: &ObjectReference) -> Option<ObjectReference> {
        self.follow(datacenter, VM_FOLDER).first().cloned()
    }

    /// Creates a folder inside `parent`.
    pub fn add_folder(&mut self, parent: &ObjectReference, name: &str) -> Result<ObjectReference, SimError> {
        self.check_container(parent, FOLDER)?;
        let obj = ObjectReference::folder(self.allocate("group-v"));
        self.attach(parent, ManagedObject::new(obj.clone(), name, Some(parent.clone())));
        Ok(obj)
    }

    /// Creates a datacenter inside `parent`, together with its VM folder.
    pub fn add_datacenter(&mut self, parent: &ObjectReference, name: &str) -> Result<ObjectReference, SimError> {
        self.check_container(parent, DATACENTER)?;
        let datacenter = ObjectReference::datacenter(self.allocate("datacenter-"));
        let vm_folder = ObjectReference::folder(self.allocate("group-v"));

        let mut object = ManagedObject::new(datacenter.clone(), name, Some(parent.clone()));
        object.links.insert(VM_FOLDER.to_owned(), vec![vm_folder.clone()]);
        self.attach(parent, object);
        self.objects.insert(
            vm_folder.clone(),
            ManagedObject::new(vm_folder, "vm", Some(datacenter.clone())),
        );
        Ok(datacenter)
    }

    /// Creates a powered-off virtual machine inside `parent`.
    pub fn add_vm(&mut self, parent: &ObjectReference, name: &str) -> Result<ObjectReference, SimError> {
        self.add_vm_with_summary(parent, name, default_summary(name))
    }

    /// Creates a virtual machine inside `parent` with the given summary.
    pub fn add_vm_with_summary(
        &mut self,
        parent: &ObjectReference,
        name: &str,
        summary: Value,
    ) -> Result<ObjectReference, SimError> {
        self.check_container(parent, VIRTUAL_MACHINE)?;
        let vm = ObjectReference::virtual_machine(self.allocate("vm-"));
        let mut object = ManagedObject::new(vm.clone(), name, Some(parent.clone()));
        object.properties.insert(SUMMARY.to_owned(), summary);
        self.attach(parent, object);
        Ok(vm)
    }

    /// Sets property `path` of `obj`, replacing any previous value.
    pub fn set_property(&mut self, obj: &ObjectReference, path: &str, value: Value) -> Result<(), SimError> {
        let object = self
            .objects
            .get_mut(obj)
            .ok_or_else(|| SimError::UnknownObject(obj.clone()))?;
        if path == "name" {
            if let Value::String(name) = &value {
                object.name.clone_from(name);
            }
        }
        object.properties.insert(path.to_owned(), value);
        Ok(())
    }

    /// Removes `obj` and everything below it.
    ///
    /// Returns the number of objects removed.
    pub fn remove(&mut self, obj: &ObjectReference) -> Result<usize, SimError> {
        if *obj == self.root {
            return Err(SimError::RootRemoval);
        }
        let parent = self
            .objects
            .get(obj)
            .ok_or_else(|| SimError::UnknownObject(obj.clone()))?
            .parent
            .clone();
        if let Some(children) = parent
            .and_then(|p| self.objects.get_mut(&p))
            .and_then(|p| p.links.get_mut(CHILD_ENTITY))
        {
            children.retain(|child| child != obj);
        }

        let mut removed = 0;
        let mut pending = vec![obj.clone()];
        while let Some(next) = pending.pop() {
            if let Some(object) = self.objects.remove(&next) {
                removed += 1;
                pending.extend(object.links.into_values().flatten());
            }
        }
        Ok(removed)
    }

    /// Returns the objects linked from `obj` through `path`.
    #[must_use]
    pub fn follow(&self, obj: &ObjectReference, path: &str) -> &[ObjectReference] {
        self.objects.get(obj).map_or(&[], |o| o.links(path))
    }

    /// Walks every object spec of `spec` and returns the objects it selects,
    /// in first-reached order and without duplicates.
    ///
    /// Each `(object, node)` pair is expanded at most once, so recursive
    /// graphs terminate.
    #[must_use]
    pub fn evaluate(&self, spec: &FilterSpecification) -> Vec<ObjectReference> {
        let mut reached = Vec::new();
        let mut reported: FxHashSet<ObjectReference> = fx_hash_set();

        for object_spec in &spec.object_set {
            if !self.contains(&object_spec.obj) {
                continue;
            }
            if !object_spec.skip && reported.insert(object_spec.obj.clone()) {
                reached.push(object_spec.obj.clone());
            }

            let graph = &object_spec.select_set;
            let mut expanded: FxHashSet<(ObjectReference, NodeId)> = fx_hash_set();
            let mut stack: Vec<(ObjectReference, NodeId)> = graph
                .entries()
                .iter()
                .rev()
                .map(|id| (object_spec.obj.clone(), *id))
                .collect();

            while let Some((obj, id)) = stack.pop() {
                let Some(node) = graph.get(id) else { continue };
                if !obj.is_a(&node.kind) || !expanded.insert((obj.clone(), id)) {
                    continue;
                }
                let targets = self.follow(&obj, &node.path);
                if !node.skip {
                    for target in targets {
                        if reported.insert(target.clone()) {
                            reached.push(target.clone());
                        }
                    }
                }
                for target in targets.iter().rev() {
                    for child in node.select_set.iter().rev() {
                        stack.push((target.clone(), *child));
                    }
                }
            }
        }
        reached
    }

    /// Returns the properties of `obj` selected by `spec`. Paths the object
    /// does not carry are omitted.
    #[must_use]
    pub fn properties(&self, obj: &ObjectReference, spec: &PropertySpec) -> PropertyValues {
        let Some(object) = self.objects.get(obj) else {
            return PropertyValues::new();
        };
        spec.path_set
            .iter()
            .filter_map(|path| object.properties.get(path).map(|v| (path.clone(), v.clone())))
            .collect()
    }

    fn check_container(&self, parent: &ObjectReference, kind: &str) -> Result<(), SimError> {
        if !self.contains(parent) {
            return Err(SimError::UnknownObject(parent.clone()));
        }
        if !parent.is_a(FOLDER) {
            return Err(SimError::invalid_parent(parent, kind));
        }
        Ok(())
    }

    fn attach(&mut self, parent: &ObjectReference, object: ManagedObject) {
        let obj = object.obj.clone();
        self.objects.insert(obj.clone(), object);
        if let Some(parent) = self.objects.get_mut(parent) {
            parent.links.entry(CHILD_ENTITY.to_owned()).or_default().push(obj);
        }
    }

    fn allocate(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.next_id);
        self.next_id += 1;
        id
    }
}

/// The summary given to virtual machines created without one.
#[must_use]
pub fn default_summary(name: &str) -> Value {
    json!({
        "config": { "name": name },
        "runtime": { "powerState": "poweredOff" },
    })
}
