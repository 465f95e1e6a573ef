//! In-place iterative radix-2 FFT
//!
//! Bit-reversal permutation followed by index-driven butterfly passes over
//! flat real/imaginary buffers. No recursion and no allocation after
//! construction, so it is safe to call from the capture callback.

use std::f64::consts::PI;

/// Precomputed twiddles and bit-reversal table for one transform size
#[derive(Clone, Debug)]
pub struct Fft {
    n: usize,
    rank: u32,
    bit_reverse: Vec<usize>,
    cos_table: Vec<f32>,
    sin_table: Vec<f32>,
}

impl Fft {
    /// Create a transform of size `2^rank`
    pub fn new(rank: u32) -> Self {
        let n = 1usize << rank;

        let bit_reverse = (0..n)
            .map(|i| {
                if rank == 0 {
                    0
                } else {
                    i.reverse_bits() >> (usize::BITS - rank)
                }
            })
            .collect();

        let half = n / 2;
        let cos_table = (0..half)
            .map(|k| (2.0 * PI * k as f64 / n as f64).cos() as f32)
            .collect();
        let sin_table = (0..half)
            .map(|k| (2.0 * PI * k as f64 / n as f64).sin() as f32)
            .collect();

        Self {
            n,
            rank,
            bit_reverse,
            cos_table,
            sin_table,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Forward transform in place; `re` and `im` must both hold `len()` values
    pub fn forward(&self, re: &mut [f32], im: &mut [f32]) {
        let n = self.n;
        debug_assert!(re.len() >= n && im.len() >= n);

        for i in 0..n {
            let j = self.bit_reverse[i];
            if j > i {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut size = 2;
        while size <= n {
            let half = size / 2;
            let stride = n / size;
            let mut start = 0;
            while start < n {
                for k in 0..half {
                    let w_re = self.cos_table[k * stride];
                    let w_im = -self.sin_table[k * stride];

                    let a = start + k;
                    let b = a + half;

                    let t_re = re[b] * w_re - im[b] * w_im;
                    let t_im = re[b] * w_im + im[b] * w_re;

                    re[b] = re[a] - t_re;
                    im[b] = im[a] - t_im;
                    re[a] += t_re;
                    im[a] += t_im;
                }
                start += size;
            }
            size *= 2;
        }
    }
}
