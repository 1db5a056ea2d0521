use crate::core::command::{Backend, Command};

/// Picks the execution backend from the configured thread count.
///
/// A thread count of zero or less offloads to the GPU; a positive count runs the threaded
/// CPU styles with that many threads.
pub fn select_backend(omp_threads: i32) -> Backend {
    if omp_threads <= 0 {
        Backend::Gpu
    } else {
        Backend::Omp {
            threads: omp_threads as u32,
        }
    }
}

/// The package/suffix pair announcing `backend` to the engine.
pub fn backend_commands(backend: Backend) -> [Command; 2] {
    [Command::Package(backend), Command::Suffix(backend)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_thread_counts_select_gpu() {
        for threads in [0, -1, i32::MIN] {
            assert_eq!(select_backend(threads), Backend::Gpu);
        }
    }

    #[test]
    fn positive_thread_counts_select_omp_with_that_many_threads() {
        assert_eq!(select_backend(1), Backend::Omp { threads: 1 });
        assert_eq!(select_backend(4), Backend::Omp { threads: 4 });
        assert_eq!(
            select_backend(i32::MAX),
            Backend::Omp {
                threads: i32::MAX as u32
            }
        );
    }

    #[test]
    fn backend_commands_are_package_then_suffix() {
        let [package, suffix] = backend_commands(Backend::Gpu);
        assert_eq!(package.to_string(), "package gpu 0");
        assert_eq!(suffix.to_string(), "suffix gpu");
    }
}
