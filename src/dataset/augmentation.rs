//! Train-Time Augmentation
//!
//! The standard CIFAR training transform: random horizontal flip plus a random
//! crop from a 4-pixel zero-padded canvas. Operates directly on the raw CHW
//! byte buffers so no image decoding is involved. Evaluation and pool-scoring
//! batches are never augmented.

use rand::Rng;

use crate::dataset::cifar::CifarItem;
use crate::{CHANNELS, IMAGE_SIZE};

/// Padding used for the random crop
pub const CROP_PADDING: usize = 4;

/// Flip a CHW image buffer horizontally in place.
pub fn flip_horizontal(image: &mut [u8]) {
    for c in 0..CHANNELS {
        let plane = &mut image[c * IMAGE_SIZE * IMAGE_SIZE..(c + 1) * IMAGE_SIZE * IMAGE_SIZE];
        for row in plane.chunks_exact_mut(IMAGE_SIZE) {
            row.reverse();
        }
    }
}

/// Crop a 32x32 window out of the zero-padded 40x40 canvas at (dy, dx).
/// Offsets must lie in `0..=2 * CROP_PADDING`.
pub fn crop_padded(image: &[u8], dy: usize, dx: usize) -> Vec<u8> {
    debug_assert!(dy <= 2 * CROP_PADDING && dx <= 2 * CROP_PADDING);

    let mut out = vec![0u8; image.len()];
    for c in 0..CHANNELS {
        let src_plane = &image[c * IMAGE_SIZE * IMAGE_SIZE..(c + 1) * IMAGE_SIZE * IMAGE_SIZE];
        let dst_plane = &mut out[c * IMAGE_SIZE * IMAGE_SIZE..(c + 1) * IMAGE_SIZE * IMAGE_SIZE];

        for y in 0..IMAGE_SIZE {
            // Source row in padded coordinates; rows outside the original
            // image stay zero.
            let py = y + dy;
            if py < CROP_PADDING || py >= IMAGE_SIZE + CROP_PADDING {
                continue;
            }
            let src_y = py - CROP_PADDING;

            for x in 0..IMAGE_SIZE {
                let px = x + dx;
                if px < CROP_PADDING || px >= IMAGE_SIZE + CROP_PADDING {
                    continue;
                }
                dst_plane[y * IMAGE_SIZE + x] = src_plane[src_y * IMAGE_SIZE + px - CROP_PADDING];
            }
        }
    }
    out
}

/// Apply the full train transform to a batch of items in place.
pub fn augment_items<R: Rng>(items: &mut [CifarItem], rng: &mut R) {
    for item in items.iter_mut() {
        if rng.gen_bool(0.5) {
            flip_horizontal(&mut item.image);
        }
        let dy = rng.gen_range(0..=2 * CROP_PADDING);
        let dx = rng.gen_range(0..=2 * CROP_PADDING);
        item.image = crop_padded(&item.image, dy, dx);
    }
}
