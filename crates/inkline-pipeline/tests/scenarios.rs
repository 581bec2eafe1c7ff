//! End-to-end behaviour of the line-art pipeline on small synthetic
//! images.

#![allow(clippy::unwrap_used)]

use image::Rgba;
use inkline_pipeline::encode::{INK, PAPER};
use inkline_pipeline::{
    EdgeMask, Parameters, Pipeline, PipelineError, RgbaImage, cleanup, encode, process,
    process_image, process_staged, sobel, threshold,
};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn png(image: &RgbaImage) -> Vec<u8> {
    encode::encode_png(image).unwrap()
}

/// Columns 0-1 black, columns 2-3 white.
fn hard_edge() -> RgbaImage {
    RgbaImage::from_fn(4, 4, |x, _| if x < 2 { BLACK } else { WHITE })
}

/// Deterministic pseudo-random colour noise.
fn noise(width: u32, height: u32) -> RgbaImage {
    let mut state: u32 = 0x2545_f491;
    RgbaImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    })
}

#[test]
fn repeated_runs_are_byte_identical() {
    let source = png(&noise(37, 23));
    let params = Parameters::default();
    let first = process(&source, &params).unwrap();
    for _ in 0..3 {
        let again = process(&source, &params).unwrap();
        assert_eq!(again.png, first.png);
    }
}

#[test]
fn output_dimensions_match_source() {
    for (w, h) in [(1, 1), (1, 9), (9, 1), (2, 2), (3, 5), (64, 17)] {
        let artifact = process(&png(&noise(w, h)), &Parameters::default()).unwrap();
        assert_eq!(artifact.dimensions.width, w);
        assert_eq!(artifact.dimensions.height, h);
        assert_eq!(artifact.rgba.dimensions(), (w, h));
        let decoded = image::load_from_memory(&artifact.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (w, h));
    }
}

#[test]
fn flat_field_has_no_edges_and_is_fully_transparent() {
    let flat = RgbaImage::from_pixel(4, 4, Rgba([90, 140, 200, 255]));
    let staged = process_staged(&png(&flat), &Parameters::default()).unwrap();
    assert_eq!(staged.raw_mask.edge_count(), 0);
    assert_eq!(staged.mask.edge_count(), 0);
    assert!(staged.artifact.rgba.pixels().all(|p| p.0 == PAPER));
}

#[test]
fn raw_edge_count_is_non_increasing_in_threshold() {
    let staged = process_staged(&png(&noise(32, 32)), &Parameters::default()).unwrap();
    let mut previous = u64::MAX;
    for t in [0.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 400.0, 2000.0] {
        let count = threshold::binarize(&staged.gradient, t).edge_count();
        assert!(count <= previous, "threshold {t} gave {count} > {previous}");
        previous = count;
    }
    assert_eq!(previous, 0);
}

#[test]
fn border_pixels_are_handled_and_gradient_ring_is_zero() {
    let staged = process_staged(&png(&noise(9, 6)), &Parameters::default()).unwrap();
    let (w, h) = staged.gradient.dimensions();
    for x in 0..w {
        assert!(staged.gradient.get_pixel(x, 0).0[0].abs() < f32::EPSILON);
        assert!(staged.gradient.get_pixel(x, h - 1).0[0].abs() < f32::EPSILON);
        assert!(!staged.raw_mask.get(x, 0));
        assert!(!staged.raw_mask.get(x, h - 1));
    }
    for y in 0..h {
        assert!(staged.gradient.get_pixel(0, y).0[0].abs() < f32::EPSILON);
        assert!(staged.gradient.get_pixel(w - 1, y).0[0].abs() < f32::EPSILON);
    }
}

#[test]
fn hard_edge_seam_is_inked_and_far_columns_stay_clear() {
    let artifact = process(&png(&hard_edge()), &Parameters::with_threshold(25.0)).unwrap();
    for y in 1..3 {
        assert_eq!(artifact.rgba.get_pixel(1, y).0, INK, "seam x=1 y={y}");
        assert_eq!(artifact.rgba.get_pixel(2, y).0, INK, "seam x=2 y={y}");
        assert_eq!(artifact.rgba.get_pixel(0, y).0, PAPER, "far x=0 y={y}");
        assert_eq!(artifact.rgba.get_pixel(3, y).0, PAPER, "far x=3 y={y}");
    }
}

#[test]
fn hard_edge_final_mask_is_the_interior_seam() {
    let staged = process_staged(&png(&hard_edge()), &Parameters::default()).unwrap();
    let expected = EdgeMask::from_fn(4, 4, |x, y| (1..3).contains(&x) && (1..3).contains(&y));
    assert_eq!(staged.raw_mask, expected);
    assert_eq!(staged.mask, expected);
}

#[test]
fn hard_edge_seam_gradient_is_strong_and_reproducible() {
    let staged = process_staged(&png(&hard_edge()), &Parameters::default()).unwrap();
    let magnitude = staged.gradient.get_pixel(1, 1).0[0];
    assert!(magnitude > 600.0, "seam magnitude {magnitude}");
    let recomputed = sobel::gradient_magnitude(&staged.blurred);
    assert_eq!(recomputed, staged.gradient);
}

#[test]
fn isolated_pixel_is_despeckled() {
    let mut mask = EdgeMask::new(5, 5);
    mask.set(2, 2, true);
    let cleaned = cleanup::clean(&mask, 1, 3);
    assert!(!cleaned.get(2, 2));
    assert_eq!(cleaned.edge_count(), 0);
}

#[test]
fn surrounded_gap_is_closed() {
    let mut mask = EdgeMask::new(5, 5);
    mask.set(1, 1, true);
    mask.set(2, 1, true);
    mask.set(3, 1, true);
    let cleaned = cleanup::clean(&mask, 1, 3);
    assert!(cleaned.get(2, 2));
}

#[test]
fn overridden_parameters_change_the_result() {
    let source = png(&noise(24, 24));
    let default = process_staged(&source, &Parameters::default()).unwrap();
    let strict = process_staged(&source, &Parameters::with_threshold(1e6)).unwrap();
    let unblurred = process_staged(
        &source,
        &Parameters {
            blur_radius: 0,
            ..Parameters::default()
        },
    )
    .unwrap();
    assert_eq!(strict.mask.edge_count(), 0);
    assert_eq!(unblurred.blurred, unblurred.intensity);
    assert_ne!(default.blurred, default.intensity);
}

#[test]
fn decoded_and_pixel_entry_points_agree() {
    let image = noise(20, 13);
    let staged = Pipeline::from_image(image.clone(), Parameters::default())
        .unwrap()
        .extract_luma()
        .blur()
        .compute_gradient()
        .threshold()
        .clean()
        .encode()
        .unwrap()
        .into_result();
    let direct = process_image(&image, &Parameters::default()).unwrap();
    assert_eq!(staged.artifact, direct);
}

#[test]
fn non_image_bytes_are_a_decode_error() {
    let result = process(b"<html>not an image</html>", &Parameters::default());
    assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
}
