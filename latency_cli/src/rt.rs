//! Real-time setup for the measurement loop.
//!
//! Scheduling jitter shows up directly as latency noise, so `--rt` asks the OS
//! for SCHED_FIFO, a pinned CPU and locked memory. Each step is best effort:
//! a failure is logged and the session continues.

use crate::cli::RtLock;

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn mlockall_flags(lock: RtLock) -> Option<libc::c_int> {
    match lock {
        RtLock::None => None,
        RtLock::Current => Some(libc::MCL_CURRENT),
        RtLock::All => Some(libc::MCL_CURRENT | libc::MCL_FUTURE),
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    let rc = unsafe { libc::mlockall(flags) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{RtLock, mlockall, mlockall_flags};

    /// Capacity of cpu_set_t in CPU indices (bits).
    const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;
    /// CAP_SYS_NICE bit in the capability masks of /proc/self/status.
    const CAP_SYS_NICE: u64 = 1 << 23;

    fn memlock_denied(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    fn memlock_limit() -> Option<String> {
        let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        let cur = unsafe { rlim.assume_init() }.rlim_cur;
        Some(if cur == libc::RLIM_INFINITY {
            "memlock limit: unlimited".to_string()
        } else {
            format!("memlock limit: {} KiB", cur / 1024)
        })
    }

    /// Lock memory; `All` falls back to `Current` when the limit is too low.
    pub(super) fn lock_memory(lock: RtLock) -> eyre::Result<()> {
        let Some(flags) = mlockall_flags(lock) else {
            return Ok(());
        };
        let Err(err) = mlockall(flags) else {
            return Ok(());
        };
        if !memlock_denied(&err) {
            eyre::bail!("mlockall failed: {err}");
        }
        let mut msg = format!("mlockall({lock:?}) failed: {err}");
        if lock == RtLock::All {
            match mlockall(libc::MCL_CURRENT) {
                Ok(()) => {
                    tracing::warn!(error = %err, "rt: locking future pages denied; locked current pages only");
                    return Ok(());
                }
                Err(e2) => msg.push_str(&format!("; fallback to current also failed: {e2}")),
            }
        }
        if let Some(limit) = memlock_limit() {
            msg.push_str(&format!("; {limit}"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and a larger 'ulimit -l'");
        Err(eyre::eyre!(msg))
    }

    fn has_sys_nice() -> bool {
        let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
            // Unknown; let sched_setscheduler decide.
            return true;
        };
        status
            .lines()
            .filter(|l| l.starts_with("CapEff:") || l.starts_with("CapPrm:"))
            .filter_map(|l| l.split_whitespace().nth(1))
            .filter_map(|hex| u64::from_str_radix(hex, 16).ok())
            .any(|caps| caps & CAP_SYS_NICE != 0)
    }

    /// SCHED_FIFO at `prio` (max when unset), clamped to the system range.
    pub(super) fn set_fifo(prio: Option<i32>) -> eyre::Result<i32> {
        let euid = unsafe { libc::geteuid() };
        if euid != 0 && !has_sys_nice() {
            eyre::bail!(
                "needs CAP_SYS_NICE or root (euid {euid}); try 'sudo setcap cap_sys_nice=ep $(which latency)'"
            );
        }
        let (min, max) = unsafe {
            (
                libc::sched_get_priority_min(libc::SCHED_FIFO),
                libc::sched_get_priority_max(libc::SCHED_FIFO),
            )
        };
        let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
        let prio = prio.unwrap_or(max).clamp(min, max);
        let param = libc::sched_param {
            sched_priority: prio,
        };
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(prio)
    }

    /// Pin the process to `cpu` if the current affinity mask allows it.
    pub(super) fn pin_cpu(cpu: usize) -> eyre::Result<()> {
        let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if online < 1 {
            eyre::bail!("_SC_NPROCESSORS_ONLN < 1");
        }
        if cpu as libc::c_long >= online {
            eyre::bail!("requested CPU {cpu} >= online {online}");
        }
        if cpu >= MAX_CPUSET_BITS {
            eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
        }
        let size = std::mem::size_of::<libc::cpu_set_t>();
        let mut allowed: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        if unsafe { libc::sched_getaffinity(0, size, &mut allowed) } == 0
            && !unsafe { libc::CPU_ISSET(cpu, &allowed) }
        {
            eyre::bail!("CPU {cpu} not permitted by current affinity mask");
        }
        let mut desired: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::CPU_ZERO(&mut desired);
            libc::CPU_SET(cpu, &mut desired);
        }
        if unsafe { libc::sched_setaffinity(0, size, &desired) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match linux::lock_memory(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "rt: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt: mlockall failed"),
        }
        match linux::set_fifo(prio) {
            Ok(p) => tracing::info!(prio = p, "rt: SCHED_FIFO applied"),
            Err(err) => tracing::warn!(?prio, error = %err, "rt: SCHED_FIFO not applied"),
        }
        let cpu = rt_cpu.unwrap_or(0);
        match linux::pin_cpu(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: pinned to cpu"),
            Err(err) => tracing::warn!(cpu, error = %err, "rt: affinity not applied"),
        }
    });
}

#[cfg(target_os = "macos")]
pub fn setup_rt_once(rt: bool, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        if let Some(flags) = mlockall_flags(lock) {
            match mlockall(flags) {
                Ok(()) => tracing::info!(mode = ?lock, "rt: memory lock applied"),
                Err(err) => tracing::warn!(mode = ?lock, error = %err, "rt: mlockall failed"),
            }
        }
        tracing::warn!("rt: macOS has no SCHED_FIFO or affinity; only mlockall applied");
    });
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn setup_rt_once(rt: bool, _lock: RtLock) {
    if rt {
        tracing::warn!("rt: real-time mode is not supported on this OS; ignoring --rt");
    }
}
