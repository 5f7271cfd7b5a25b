//! Vector operations.

use crate::closure::{ClosureId, Tracked};
use crate::dense::{check_operands, check_size, DenseClosure, Scalar, Vector};
use crate::error::Result;
use crate::graph::WorkId;
use crate::kernels::{self, Element};

/// `x = alpha * v`
pub fn assign<T: Element>(x: &mut Vector<T>, v: &Vector<T>, alpha: T) -> Result<WorkId> {
    check_operands("assign", &x.storage, &[&v.storage])?;
    check_size("assign", x.len(), v.len())?;
    let (dst, src) = (x.closure(), v.closure());
    Ok(x.scheduler().spawn(
        move || kernels::assign(&mut dst.write(), &src.read(), alpha),
        x.dependencies(),
        &[v.dependencies()],
    ))
}

/// `x += alpha * v`
pub fn plus_assign<T: Element>(x: &mut Vector<T>, v: &Vector<T>, alpha: T) -> Result<WorkId> {
    check_operands("plus_assign", &x.storage, &[&v.storage])?;
    check_size("plus_assign", x.len(), v.len())?;
    let (dst, src) = (x.closure(), v.closure());
    Ok(x.scheduler().spawn(
        move || kernels::plus_assign(&mut dst.write(), &src.read(), alpha),
        x.dependencies(),
        &[v.dependencies()],
    ))
}

/// `x += alpha * v`, evaluated through a snapshot of `v`.
///
/// `v` is copied into a temporary owned by the scheduler, so later writers
/// of `v` only wait for the copy, not for the update of `x`. The temporary
/// is released once the update has run.
pub fn plus_assign_aliased<T: Element>(
    x: &mut Vector<T>,
    v: &Vector<T>,
    alpha: T,
) -> Result<ClosureId> {
    check_operands("plus_assign_aliased", &x.storage, &[&v.storage])?;
    check_size("plus_assign_aliased", x.len(), v.len())?;
    let scheduler = x.scheduler().clone();
    let id = scheduler.create_closure(DenseClosure::zeroed(v.len(), 1), |temp| {
        let (snapshot, src) = (DenseClosure::clone(temp), v.closure());
        scheduler.spawn(
            move || snapshot.write().copy_from_slice(&src.read()),
            temp.dependencies(),
            &[v.dependencies()],
        );
        let (dst, snapshot) = (x.closure(), DenseClosure::clone(temp));
        scheduler.spawn(
            move || kernels::plus_assign(&mut dst.write(), &snapshot.read(), alpha),
            x.dependencies(),
            &[temp.dependencies()],
        );
    });
    Ok(id)
}

/// `x *= t`
pub fn scale<T: Element>(x: &mut Vector<T>, t: T) -> WorkId {
    let dst = x.closure();
    x.scheduler()
        .spawn(move || kernels::scale(&mut dst.write(), t), x.dependencies(), &[])
}

/// `x += t` elementwise.
pub fn add_scalar<T: Element>(x: &mut Vector<T>, t: T) -> WorkId {
    let dst = x.closure();
    x.scheduler().spawn(
        move || kernels::add_scalar(&mut dst.write(), t),
        x.dependencies(),
        &[],
    )
}

/// Schedule `x . y`. The result is readable from the returned [`Scalar`].
pub fn dot<T: Element>(x: &Vector<T>, y: &Vector<T>) -> Result<Scalar<T>> {
    check_operands("dot", &x.storage, &[&y.storage])?;
    check_size("dot", x.len(), y.len())?;
    let out = Scalar::new_in(x.scheduler(), T::default());
    let (dst, a, b) = (out.closure(), x.closure(), y.closure());
    x.scheduler().spawn(
        move || {
            let value = if a.dependencies().ptr_eq(b.dependencies()) {
                let a = a.read();
                kernels::dot(&a, &a)
            } else {
                kernels::dot(&a.read(), &b.read())
            };
            dst.write()[0] = value;
        },
        out.dependencies(),
        &[x.dependencies(), y.dependencies()],
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use crate::exec::PoolConfig;
    use crate::graph::Scheduler;

    fn scheduler() -> Scheduler {
        Scheduler::new(PoolConfig::with_workers(3)).unwrap()
    }

    #[test]
    fn chained_updates_apply_in_order() {
        let s = scheduler();
        let mut x = Vector::from_vec_in(&s, vec![1.0, 2.0]);
        let v = Vector::from_vec_in(&s, vec![10.0, 20.0]);

        plus_assign(&mut x, &v, 1.0).unwrap();
        scale(&mut x, 2.0);
        add_scalar(&mut x, -1.0);
        assert_eq!(x.to_vec().unwrap(), vec![21.0, 43.0]);

        assign(&mut x, &v, 0.5).unwrap();
        assert_eq!(x.to_vec().unwrap(), vec![5.0, 10.0]);
    }

    #[test]
    fn size_mismatch_schedules_nothing() {
        let s = scheduler();
        let mut x = Vector::<f64>::new_in(&s, 2);
        let v = Vector::<f64>::new_in(&s, 3);
        let err = plus_assign(&mut x, &v, 1.0).unwrap_err();
        assert!(matches!(err, SchedulerError::SizeMismatch { op: "plus_assign", .. }));
        assert_eq!(s.stats().spawned, 0);
        assert!(x.is_ready());
    }

    #[test]
    fn operands_on_other_scheduler_are_rejected() {
        let a = scheduler();
        let b = scheduler();
        let mut x = Vector::<i32>::new_in(&a, 2);
        let v = Vector::<i32>::new_in(&b, 2);
        assert!(matches!(
            assign(&mut x, &v, 1),
            Err(SchedulerError::SchedulerMismatch { op: "assign" })
        ));
    }

    #[test]
    fn aliased_update_uses_snapshot() {
        let s = scheduler();
        let mut x = Vector::from_vec_in(&s, vec![1, 1, 1]);
        let mut v = Vector::from_vec_in(&s, vec![1, 2, 3]);

        let temp = plus_assign_aliased(&mut x, &v, 2).unwrap();
        // Overwrites v; the pending update must still see the old values.
        v.fill(100);

        assert_eq!(x.to_vec().unwrap(), vec![3, 5, 7]);
        assert_eq!(v.to_vec().unwrap(), vec![100; 3]);
        s.wait();
        assert!(!s.is_closure_live(temp));
    }

    #[test]
    fn dot_product_is_async() {
        let s = scheduler();
        let x = Vector::from_vec_in(&s, vec![1, 2, 3]);
        let y = Vector::from_vec_in(&s, vec![4, 5, 6]);
        assert_eq!(dot(&x, &y).unwrap().value().unwrap(), 32);
        assert_eq!(dot(&x, &x).unwrap().value().unwrap(), 14);
    }
}
