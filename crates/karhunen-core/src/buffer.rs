//! Fallible allocation of fixed-size scratch buffers.

use crate::error::{KltError, Result};

/// Allocate a `len`-element buffer filled with `T::default()`.
///
/// Reports [`KltError::Allocation`] instead of aborting when the allocator
/// refuses the request.
pub(crate) fn zeroed<T: Clone + Default>(buffer: &'static str, len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| KltError::Allocation { buffer, len })?;
    v.resize(len, T::default());
    Ok(v)
}

/// Element count `a · b` for `buffer`, or [`KltError::Allocation`] when it
/// does not fit in `usize`.
pub(crate) fn product(buffer: &'static str, a: usize, b: usize) -> Result<usize> {
    a.checked_mul(b).ok_or(KltError::Allocation {
        buffer,
        len: usize::MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_has_requested_length() {
        let v: Vec<f32> = zeroed("test", 17).unwrap();
        assert_eq!(v.len(), 17);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn impossible_request_reports_buffer_name() {
        let err = zeroed::<u64>("huge", usize::MAX).unwrap_err();
        assert_eq!(
            err,
            KltError::Allocation {
                buffer: "huge",
                len: usize::MAX
            }
        );
    }

    #[test]
    fn overflowing_product_is_an_allocation_error() {
        assert_eq!(product("basis", 6, 7), Ok(42));
        assert_eq!(
            product("basis", usize::MAX / 2, 3),
            Err(KltError::Allocation {
                buffer: "basis",
                len: usize::MAX
            })
        );
    }
}
