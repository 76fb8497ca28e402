use rayon::prelude::*;

use woundscale_image::Image;

/// Apply a function to each pixel in the image in parallel.
///
/// The closure receives the channels of the source pixel and the channels of the
/// destination pixel at the same location.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }
    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .chunks_exact(C1)
                .zip(dst_chunk.chunks_exact_mut(C2))
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Apply a function to each pixel in the image in parallel with a value.
pub fn par_iter_rows_val<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }
    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .iter()
                .zip(dst_chunk.iter_mut())
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Fill the interior of a single channel image from a 3x3 neighbourhood in parallel.
///
/// The closure receives the source slice, the number of columns and the flat index of
/// the centre pixel. The 1-pixel border of `dst` is left untouched.
pub(crate) fn par_iter_interior<T>(
    src: &Image<f32, 1>,
    dst: &mut Image<T, 1>,
    f: impl Fn(&[f32], usize, usize) -> T + Send + Sync,
) where
    T: Send + Sync,
{
    let (cols, rows) = (src.cols(), src.rows());
    if cols < 3 || rows < 3 {
        return;
    }
    let src_data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .enumerate()
        .for_each(|(row_idx, row_chunk)| {
            if row_idx == 0 || row_idx == rows - 1 {
                // skip the first and last row
                return;
            }

            let row_offset = row_idx * cols;

            for (col_idx, dst_pixel) in row_chunk.iter_mut().enumerate() {
                if col_idx == 0 || col_idx == cols - 1 {
                    // skip the first and last column
                    continue;
                }
                *dst_pixel = f(src_data, cols, row_offset + col_idx);
            }
        });
}
