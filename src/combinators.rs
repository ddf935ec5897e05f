//! Small fan-in combinators over tasks.

use crate::task::{spawn, Task};
use futures::future::BoxFuture;

/// Tuples of tasks that can be joined in index order.
pub trait TaskList {
    /// Ordered tuple of the joined values.
    type Output: Send + 'static;

    /// Await every element in index order and gather the values.
    fn join_ordered(self) -> BoxFuture<'static, Self::Output>;
}

macro_rules! impl_task_list {
    ($($T:ident => $idx:tt),+) => {
        impl<$($T),+> TaskList for ($(Task<$T>,)+)
        where
            $($T: Default + Send + 'static,)+
        {
            type Output = ($($T,)+);

            fn join_ordered(self) -> BoxFuture<'static, Self::Output> {
                Box::pin(async move {
                    (
                        $(
                            match self.$idx.wait().await {
                                Ok(value) => value,
                                Err(error) => {
                                    tracing::error!(%error, "joined task failed; substituting default");
                                    <$T>::default()
                                }
                            },
                        )+
                    )
                })
            }
        }
    };
}

impl_task_list!(T0 => 0);
impl_task_list!(T0 => 0, T1 => 1);
impl_task_list!(T0 => 0, T1 => 1, T2 => 2);
impl_task_list!(T0 => 0, T1 => 1, T2 => 2, T3 => 3);
impl_task_list!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4);
impl_task_list!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5);
impl_task_list!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6);
impl_task_list!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6, T7 => 7);

/// Join a tuple of tasks into one task producing the ordered value tuple.
///
/// The children are already running — construction is eager — so awaiting
/// them one by one in index order loses no concurrency; the combined task
/// settles when the last child settles. A child that fails contributes its
/// element's default value; children surface their own errors through their
/// own result slots before being handed to `when_all`.
pub fn when_all<L: TaskList>(tasks: L) -> Task<L::Output> {
    spawn(tasks.join_ordered())
}
