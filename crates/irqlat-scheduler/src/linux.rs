//! Linux-specific platform implementation.

#![expect(unsafe_code, reason = "sched/mlock syscalls through libc")]

use crate::error::{RTResult, RTSetupError};
use crate::rt_setup::RTSetup;
use libc::{
    MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, cpu_set_t, mlockall, pthread_self, pthread_setschedparam,
    sched_get_priority_max, sched_param, sched_setaffinity,
};
use std::io;
use tracing::{debug, warn};

/// Apply Linux-specific RT setup to the calling thread.
///
/// Returns the granted `SCHED_FIFO` priority, or `None` when elevation was not
/// requested. Affinity is applied first so the thread is already on its CPU
/// when it starts preempting others there.
pub(crate) fn apply_rt_setup(setup: &RTSetup) -> RTResult<Option<i32>> {
    if let Some(mask) = setup.cpu_affinity {
        set_affinity(setup, mask)?;
    }

    let priority = if setup.high_priority {
        Some(elevate()?)
    } else {
        None
    };

    if setup.lock_memory {
        lock_memory();
    }

    Ok(priority)
}

fn elevate() -> RTResult<i32> {
    // SAFETY: sched_get_priority_max only inspects its integer argument.
    let priority = unsafe { sched_get_priority_max(SCHED_FIFO) };
    if priority == -1 {
        return Err(RTSetupError::PriorityQuery(io::Error::last_os_error()));
    }

    let param = sched_param {
        sched_priority: priority,
    };
    // SAFETY: pthread_self has no preconditions and always succeeds.
    let thread = unsafe { pthread_self() };
    // SAFETY: `thread` is the calling thread and `param` outlives the call.
    let rc = unsafe { pthread_setschedparam(thread, SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(RTSetupError::SetScheduler {
            priority,
            source: io::Error::from_raw_os_error(rc),
        });
    }

    debug!(priority, "thread switched to SCHED_FIFO");
    Ok(priority)
}

fn set_affinity(setup: &RTSetup, mask: u64) -> RTResult {
    if mask == 0 {
        return Err(RTSetupError::EmptyAffinity);
    }

    // SAFETY: cpu_set_t is a plain bit array; all-zero is the empty set.
    let mut set: cpu_set_t = unsafe { std::mem::zeroed() };
    for cpu in setup.affinity_cpus() {
        // SAFETY: `cpu` < 64, well inside CPU_SETSIZE.
        unsafe { libc::CPU_SET(cpu, &mut set) };
    }

    // SAFETY: pid 0 targets the calling thread; `set` is valid for its size.
    let rc = unsafe { sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &set) };
    if rc != 0 {
        return Err(RTSetupError::Affinity {
            mask,
            source: io::Error::last_os_error(),
        });
    }

    debug!(mask = format_args!("{mask:#x}"), "CPU affinity applied");
    Ok(())
}

fn lock_memory() {
    // SAFETY: mlockall takes flags only and does not touch caller memory.
    let rc = unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) };
    if rc != 0 {
        // Non-fatal: page faults only add noise to the measurement.
        warn!(error = %io::Error::last_os_error(), "mlockall failed, memory not locked");
    }
}
