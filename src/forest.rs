//! Task tree model.
//!
//! A project's tasks are stored flat; the hierarchy is reconstructed on every
//! read from the identifiers. `Forest` keeps the tasks in an arena (a `Vec`)
//! and links them by index, so there are no owning cycles and every parent
//! lookup is a map hit rather than a scan.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{PlanError, Result};
use crate::ident;
use crate::task::Task;

/// Arena-backed forest of one project's tasks.
#[derive(Debug, Default)]
pub struct Forest {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    changed: BTreeSet<usize>,
}

impl Forest {
    /// Link a flat task list into a forest.
    ///
    /// A task whose derived parent is not in the list becomes a root. Two
    /// tasks sharing an identifier is rejected with `DuplicateIdentifier`.
    pub fn build(tasks: Vec<Task>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, t) in tasks.iter().enumerate() {
            if index.insert(t.identifier.clone(), i).is_some() {
                return Err(PlanError::DuplicateIdentifier(t.identifier.clone()));
            }
        }

        let n = tasks.len();
        let mut parent = vec![None; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (i, t) in tasks.iter().enumerate() {
            match t.parent_identifier().and_then(|p| index.get(p).copied()) {
                Some(p) => {
                    parent[i] = Some(p);
                    children[p].push(i);
                }
                None => roots.push(i),
            }
        }

        let mut forest = Forest {
            tasks,
            index,
            parent,
            children,
            roots,
            changed: BTreeSet::new(),
        };
        forest.sort_links();
        Ok(forest)
    }

    fn sort_links(&mut self) {
        let keys: Vec<String> = self.tasks.iter().map(|t| ident::sort_key(&t.identifier)).collect();
        self.roots.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
        for list in &mut self.children {
            list.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Arena index of the task with this identifier.
    pub fn find(&self, identifier: &str) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    pub fn get(&self, idx: usize) -> &Task {
        &self.tasks[idx]
    }

    /// Task by identifier.
    pub fn task(&self, identifier: &str) -> Option<&Task> {
        self.find(identifier).map(|i| &self.tasks[i])
    }

    /// Mutable access. Callers that change the task should also call
    /// [`Forest::mark_changed`] so the change is persisted.
    pub fn get_mut(&mut self, idx: usize) -> &mut Task {
        &mut self.tasks[idx]
    }

    pub fn mark_changed(&mut self, idx: usize) {
        self.changed.insert(idx);
    }

    /// Tasks modified since the forest was built, in arena order.
    pub fn changed(&self) -> impl Iterator<Item = &Task> + '_ {
        self.changed.iter().map(move |&i| &self.tasks[i])
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parent[idx]
    }

    /// Direct children in natural identifier order.
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Root tasks in natural identifier order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Ancestors of `idx`, nearest first.
    ///
    /// A broken parent chain simply ends the walk. Meeting the same task twice
    /// is reported as `MalformedData` instead of looping.
    pub fn ancestors(&self, idx: usize) -> Result<Vec<usize>> {
        let mut seen = HashSet::new();
        seen.insert(idx);
        let mut out = Vec::new();
        let mut cur = self.parent[idx];
        while let Some(p) = cur {
            if !seen.insert(p) {
                return Err(PlanError::MalformedData(format!(
                    "{} appears twice in the ancestor chain of {}",
                    self.tasks[p].identifier, self.tasks[idx].identifier
                )));
            }
            out.push(p);
            cur = self.parent[p];
        }
        Ok(out)
    }

    /// Depth-first, pre-order walk of everything below `idx` (not including it).
    pub fn descendants(&self, idx: usize) -> Descendants<'_> {
        let mut stack: Vec<usize> = self.children[idx].clone();
        stack.reverse();
        Descendants {
            forest: self,
            stack,
        }
    }

    /// Every task in tree order: each root followed by its descendants.
    pub fn preorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.tasks.len());
        for &root in &self.roots {
            out.push(root);
            out.extend(self.descendants(root).map(|(i, _)| i));
        }
        out
    }

    /// Identifiers removed when `idx` is deleted: the task and all descendants.
    pub fn subtree_identifiers(&self, idx: usize) -> Vec<String> {
        let mut out = vec![self.tasks[idx].identifier.clone()];
        out.extend(self.descendants(idx).map(|(_, t)| t.identifier.clone()));
        out
    }

    /// Add a new task under `parent_idx`.
    ///
    /// The task's identifier must name `parent_idx` as its parent and must not
    /// be deeper than [`ident::MAX_DEPTH`].
    pub fn add_child(&mut self, parent_idx: usize, task: Task) -> Result<usize> {
        let expected = self.tasks[parent_idx].identifier.as_str();
        if task.parent_identifier() != Some(expected) {
            return Err(PlanError::MalformedData(format!(
                "{} is not a child identifier of {}",
                task.identifier, expected
            )));
        }
        self.attach(Some(parent_idx), task)
    }

    /// Add a new task, linking it to its derived parent when that exists.
    pub fn insert(&mut self, task: Task) -> Result<usize> {
        let parent = task.parent_identifier().and_then(|p| self.find(p));
        self.attach(parent, task)
    }

    fn attach(&mut self, parent_idx: Option<usize>, task: Task) -> Result<usize> {
        if task.depth() > ident::MAX_DEPTH {
            return Err(PlanError::DepthExceeded(task.identifier));
        }
        if self.index.contains_key(&task.identifier) {
            return Err(PlanError::DuplicateIdentifier(task.identifier));
        }

        let idx = self.tasks.len();
        let key = ident::sort_key(&task.identifier);
        self.index.insert(task.identifier.clone(), idx);
        self.tasks.push(task);
        self.parent.push(parent_idx);
        self.children.push(Vec::new());
        self.changed.insert(idx);

        let tasks = &self.tasks;
        let siblings = match parent_idx {
            Some(p) => &mut self.children[p],
            None => &mut self.roots,
        };
        let pos = siblings.partition_point(|&s| ident::sort_key(&tasks[s].identifier) <= key);
        siblings.insert(pos, idx);
        Ok(idx)
    }

    /// Give the tasks back, in arena order.
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

/// Lazy pre-order iterator over a task's descendants.
pub struct Descendants<'a> {
    forest: &'a Forest,
    stack: Vec<usize>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (usize, &'a Task);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        self.stack.extend(self.forest.children[idx].iter().rev());
        Some((idx, &self.forest.tasks[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(forest: &Forest, list: &[usize]) -> Vec<String> {
        list.iter().map(|&i| forest.get(i).identifier.clone()).collect()
    }

    fn sample() -> Forest {
        let tasks = ["TASK2", "TASK1.10", "TASK1", "TASK1.2", "TASK1.2.1", "TASK10", "TASK7.1"]
            .iter()
            .map(|id| Task::new(*id, "t"))
            .collect();
        Forest::build(tasks).unwrap()
    }

    #[test]
    fn test_build_links_by_identifier() {
        let f = sample();
        assert_eq!(ids(&f, f.roots()), ["TASK1", "TASK2", "TASK7.1", "TASK10"]);
        let t1 = f.find("TASK1").unwrap();
        assert_eq!(ids(&f, f.children(t1)), ["TASK1.2", "TASK1.10"]);
        // Orphan becomes a root.
        assert_eq!(f.parent(f.find("TASK7.1").unwrap()), None);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let tasks = vec![Task::new("TASK1", "a"), Task::new("TASK1", "b")];
        assert!(matches!(
            Forest::build(tasks),
            Err(PlanError::DuplicateIdentifier(id)) if id == "TASK1"
        ));
    }

    #[test]
    fn test_ancestors_child_to_root() {
        let f = sample();
        let leaf = f.find("TASK1.2.1").unwrap();
        assert_eq!(ids(&f, &f.ancestors(leaf).unwrap()), ["TASK1.2", "TASK1"]);
        let root = f.find("TASK2").unwrap();
        assert!(f.ancestors(root).unwrap().is_empty());
    }

    #[test]
    fn test_descendants_preorder() {
        let f = sample();
        let t1 = f.find("TASK1").unwrap();
        let got: Vec<&str> = f.descendants(t1).map(|(_, t)| t.identifier.as_str()).collect();
        assert_eq!(got, ["TASK1.2", "TASK1.2.1", "TASK1.10"]);
        assert_eq!(f.subtree_identifiers(t1).len(), 4);
    }

    #[test]
    fn test_flatten_round_trip() {
        let f = sample();
        let mut flat = ids(&f, &f.preorder());
        let mut original: Vec<String> = f.into_tasks().into_iter().map(|t| t.identifier).collect();
        flat.sort();
        original.sort();
        assert_eq!(flat, original);
    }

    #[test]
    fn test_add_child_depth_exceeded() {
        let tasks = vec![
            Task::new("TASK1", "a"),
            Task::new("TASK1.2", "b"),
            Task::new("TASK1.2.3", "c"),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let p = f.find("TASK1.2.3").unwrap();
        let err = f.add_child(p, Task::new("TASK1.2.3.4", "d")).unwrap_err();
        assert!(matches!(err, PlanError::DepthExceeded(id) if id == "TASK1.2.3.4"));
    }

    #[test]
    fn test_add_child_keeps_sibling_order() {
        let tasks = vec![
            Task::new("TASK1", "a"),
            Task::new("TASK1.10", "b"),
            Task::new("TASK1.1", "c"),
        ];
        let mut f = Forest::build(tasks).unwrap();
        let p = f.find("TASK1").unwrap();
        let idx = f.add_child(p, Task::new("TASK1.2", "d")).unwrap();
        assert_eq!(ids(&f, f.children(p)), ["TASK1.1", "TASK1.2", "TASK1.10"]);
        assert_eq!(f.parent(idx), Some(p));
        assert_eq!(f.changed().count(), 1);
    }

    #[test]
    fn test_add_child_rejects_foreign_identifier() {
        let mut f = Forest::build(vec![Task::new("TASK1", "a")]).unwrap();
        let p = f.find("TASK1").unwrap();
        assert!(f.add_child(p, Task::new("TASK2.1", "x")).is_err());
    }
}
