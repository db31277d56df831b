// src/task.rs

//! Task nodes.
//!
//! A [`Task`] is an immutable handle to a work function plus the tasks it
//! depends on. Identity is by construction, not by value: every call to a
//! constructor yields a new [`TaskId`], and cloning a `Task` only clones the
//! handle. The same task set can be executed any number of times; a task
//! holds no per-run state.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::Context;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Type-erased work function shared by every run of a task.
pub(crate) type Work<E> = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

pub struct Task<E> {
    inner: Arc<TaskInner<E>>,
}

struct TaskInner<E> {
    id: TaskId,
    name: Option<String>,
    work: Work<E>,
    deps: Vec<Task<E>>,
}

impl<E: Send + 'static> Task<E> {
    /// Build a task from an async work function and its direct dependencies.
    ///
    /// ```ignore
    /// let a = Task::new(|_ctx| async { Ok::<_, MyError>(()) }, &[]);
    /// let b = Task::new(|_ctx| async { Ok(()) }, &[&a]);
    /// ```
    pub fn new<F, Fut>(work: F, deps: &[&Task<E>]) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self::builder().after_all(deps).build(work)
    }

    /// Build a task from a synchronous work function.
    ///
    /// The function runs on tokio's blocking pool, so it may block freely.
    pub fn blocking<F>(work: F, deps: &[&Task<E>]) -> Self
    where
        F: Fn(Context) -> Result<(), E> + Send + Sync + 'static,
    {
        Self::builder().after_all(deps).build_blocking(work)
    }

    pub fn builder() -> TaskBuilder<E> {
        TaskBuilder {
            name: None,
            deps: Vec::new(),
        }
    }
}

impl<E> Task<E> {
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Direct dependencies, in declaration order.
    pub fn dependencies(&self) -> &[Task<E>] {
        &self.inner.deps
    }

    pub(crate) fn work(&self) -> &Work<E> {
        &self.inner.work
    }
}

impl<E> Clone for Task<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for Task<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deps: Vec<TaskId> = self.inner.deps.iter().map(Task::id).collect();
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("deps", &deps)
            .finish()
    }
}

impl<E> fmt::Display for Task<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.name {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.inner.id),
        }
    }
}

/// Builder for tasks that need a name or are assembled incrementally.
pub struct TaskBuilder<E> {
    name: Option<String>,
    deps: Vec<Task<E>>,
}

impl<E: Send + 'static> TaskBuilder<E> {
    /// Name used in logs and `Display`. Has no effect on identity.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn after(mut self, dep: &Task<E>) -> Self {
        self.deps.push(dep.clone());
        self
    }

    pub fn after_all(mut self, deps: &[&Task<E>]) -> Self {
        self.deps.extend(deps.iter().map(|dep| (*dep).clone()));
        self
    }

    pub fn build<F, Fut>(self, work: F) -> Task<E>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let work: Work<E> = Arc::new(move |ctx| work(ctx).boxed());
        self.finish(work)
    }

    pub fn build_blocking<F>(self, work: F) -> Task<E>
    where
        F: Fn(Context) -> Result<(), E> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let work: Work<E> = Arc::new(move |ctx| {
            let work = Arc::clone(&work);
            async move {
                match tokio::task::spawn_blocking(move || work(ctx)).await {
                    Ok(result) => result,
                    // Re-raise on this task so the fault normalizer sees the
                    // original payload.
                    Err(err) => match err.try_into_panic() {
                        Ok(payload) => std::panic::resume_unwind(payload),
                        Err(err) => std::panic::resume_unwind(Box::new(err.to_string())),
                    },
                }
            }
            .boxed()
        });
        self.finish(work)
    }

    fn finish(self, work: Work<E>) -> Task<E> {
        Task {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                name: self.name,
                work,
                deps: self.deps,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Task<()> {
        Task::new(|_ctx| async { Ok(()) }, &[])
    }

    #[test]
    fn identical_tasks_are_distinct() {
        let a = noop();
        let b = noop();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn dependencies_keep_declaration_order() {
        let a = noop();
        let b = noop();
        let c = Task::new(|_ctx| async { Ok(()) }, &[&b, &a]);
        let ids: Vec<TaskId> = c.dependencies().iter().map(Task::id).collect();
        assert_eq!(ids, vec![b.id(), a.id()]);
    }

    #[test]
    fn display_prefers_name() {
        let a = noop();
        assert_eq!(a.to_string(), format!("task#{}", a.id().as_u64()));

        let named: Task<()> = Task::builder()
            .name("compile")
            .after(&a)
            .build(|_ctx| async { Ok(()) });
        assert_eq!(named.to_string(), "compile");
        assert_eq!(named.name(), Some("compile"));
        assert_eq!(named.dependencies().len(), 1);
    }
}
