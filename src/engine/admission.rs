/// Host-CPU-count-based admission concurrency, per the piecewise table: for
/// small machines scale up aggressively (I/O-bound work benefits from more
/// in-flight admissions than CPUs), for larger machines taper off and cap.
pub fn base_admission_concurrency() -> usize {
    admission_concurrency_for(num_cpus::get())
}

fn admission_concurrency_for(cpus: usize) -> usize {
    let raw = if cpus <= 2 {
        cpus * 2
    } else if cpus <= 8 {
        cpus * 3
    } else if cpus <= 16 {
        cpus * 2
    } else {
        32
    };
    raw.clamp(2, 64)
}

/// Scales the base admission concurrency down for small directories (few
/// children don't benefit from full parallelism) and keeps it at full
/// strength for large ones.
pub fn admission_concurrency_for_directory(base: usize, child_count: usize) -> usize {
    if child_count < 8 {
        (base / 2).max(1)
    } else {
        base
    }
}
