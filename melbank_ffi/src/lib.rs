//! C-linkage adapter over `melbank_core::compute_fbank`.
//!
//! The output buffer is allocated here and owned by the caller until it is
//! handed back through [`melbank_destroy_fbank_result`]. See
//! `include/melbank.h` for the C declarations.

use std::ptr;
use std::slice;

use melbank_core::compute_fbank;

/// Flattened fbank output for foreign callers.
///
/// `frames` holds `num_frames * num_bins` floats, row-major (frame-major,
/// bin-minor). `frames` is non-null whenever this value came out of
/// [`melbank_compute_fbank`]; a zero-frame result carries a valid zero-length
/// allocation. Release exactly once via [`melbank_destroy_fbank_result`].
#[repr(C)]
pub struct FbankResult {
    pub frames: *mut f32,
    pub num_frames: i32,
    pub num_bins: i32,
}

/// Compute 80-bin fbank features over a 16 kHz f32 waveform.
///
/// `waveform_len <= 0` is treated as an empty waveform and `waveform` is not
/// read; it may be null in that case.
///
/// # Safety
///
/// For `waveform_len > 0`, `waveform` must point to at least `waveform_len`
/// valid, initialized f32 samples for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn melbank_compute_fbank(
    waveform: *const f32,
    waveform_len: i32,
) -> FbankResult {
    let samples: &[f32] = if waveform_len <= 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(waveform, waveform_len as usize) }
    };

    let features = compute_fbank(samples);
    let num_frames = features.num_frames as i32;
    let num_bins = features.num_bins as i32;

    // Box<[f32]> guarantees capacity == length, so destroy can rebuild the
    // allocation from the two dimensions alone.
    let buffer: Box<[f32]> = features.frames.into_boxed_slice();

    FbankResult {
        frames: Box::into_raw(buffer) as *mut f32,
        num_frames,
        num_bins,
    }
}

/// Release a result produced by [`melbank_compute_fbank`].
///
/// Frees the buffer if non-null, then nulls the pointer and zeroes both
/// dimensions so accidental reuse is observably empty. A null `result`, or a
/// result whose buffer is already null, is a no-op.
///
/// # Safety
///
/// `result` must be null or point to a valid `FbankResult`. The buffer must
/// not have been freed already through a still-live copy of the same pointer
/// (double free), and must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn melbank_destroy_fbank_result(result: *mut FbankResult) {
    let Some(result) = (unsafe { result.as_mut() }) else {
        return;
    };

    if !result.frames.is_null() {
        let len = result.num_frames as usize * result.num_bins as usize;
        let slice_ptr = ptr::slice_from_raw_parts_mut(result.frames, len);
        drop(unsafe { Box::from_raw(slice_ptr) });
    }

    result.frames = ptr::null_mut();
    result.num_frames = 0;
    result.num_bins = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_wave(num_samples: usize, frequency: f32) -> Vec<f32> {
        (0..num_samples)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f32 / 16_000.0).sin())
            .collect()
    }

    #[test]
    fn compute_and_destroy_one_second() {
        let waveform = sine_wave(16_000, 440.0);
        let mut result =
            unsafe { melbank_compute_fbank(waveform.as_ptr(), waveform.len() as i32) };

        assert!(!result.frames.is_null());
        assert!(result.num_frames > 0);
        assert_eq!(result.num_bins, 80);

        let values = unsafe {
            slice::from_raw_parts(
                result.frames,
                result.num_frames as usize * result.num_bins as usize,
            )
        };
        assert!(values.iter().all(|v| v.is_finite()));

        unsafe { melbank_destroy_fbank_result(&mut result) };
        assert!(result.frames.is_null());
        assert_eq!(result.num_frames, 0);
        assert_eq!(result.num_bins, 0);
    }

    #[test]
    fn empty_waveform_yields_zero_frames() {
        let mut result = unsafe { melbank_compute_fbank(ptr::null(), 0) };
        assert!(!result.frames.is_null());
        assert_eq!(result.num_frames, 0);
        assert_eq!(result.num_bins, 80);
        unsafe { melbank_destroy_fbank_result(&mut result) };
    }

    #[test]
    fn negative_length_is_treated_as_empty() {
        let mut result = unsafe { melbank_compute_fbank(ptr::null(), -5) };
        assert_eq!(result.num_frames, 0);
        assert_eq!(result.num_bins, 80);
        unsafe { melbank_destroy_fbank_result(&mut result) };
    }

    #[test]
    fn destroy_is_idempotent_once_nulled() {
        let waveform = sine_wave(4_000, 440.0);
        let mut result =
            unsafe { melbank_compute_fbank(waveform.as_ptr(), waveform.len() as i32) };

        unsafe { melbank_destroy_fbank_result(&mut result) };
        // Second call sees a null buffer and must be a no-op.
        unsafe { melbank_destroy_fbank_result(&mut result) };
        assert!(result.frames.is_null());
    }

    #[test]
    fn destroy_of_null_result_is_a_noop() {
        unsafe { melbank_destroy_fbank_result(ptr::null_mut()) };
    }

    #[test]
    fn repeated_cycles_hold_invariants() {
        for len in [0usize, 1, 159, 160, 399, 400, 1_600, 16_000] {
            let waveform = sine_wave(len, 440.0);
            let mut result =
                unsafe { melbank_compute_fbank(waveform.as_ptr(), waveform.len() as i32) };

            assert_eq!(result.num_bins, 80, "len={len}");
            assert!(result.num_frames >= 0, "len={len}");
            assert!(!result.frames.is_null(), "len={len}");

            unsafe { melbank_destroy_fbank_result(&mut result) };
            assert!(result.frames.is_null(), "len={len}");
        }
    }

    #[test]
    fn identical_input_is_deterministic_across_the_boundary() {
        let waveform = sine_wave(8_000, 440.0);

        let mut a = unsafe { melbank_compute_fbank(waveform.as_ptr(), waveform.len() as i32) };
        let mut b = unsafe { melbank_compute_fbank(waveform.as_ptr(), waveform.len() as i32) };

        assert_eq!(a.num_frames, b.num_frames);
        assert_eq!(a.num_bins, b.num_bins);

        let len = a.num_frames as usize * a.num_bins as usize;
        let va = unsafe { slice::from_raw_parts(a.frames, len) };
        let vb = unsafe { slice::from_raw_parts(b.frames, len) };
        assert_eq!(va, vb);

        unsafe {
            melbank_destroy_fbank_result(&mut a);
            melbank_destroy_fbank_result(&mut b);
        }
    }
}
