use std::cell::Cell;
use std::rc::Rc;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use segcut::cluster::Clusterer;
use segcut::color::Color;
use segcut::gmm::PARAMS_LEN;
use segcut::graph::{FlowNetwork, MinCut, MinCutSolver};
use segcut::segmentation::{decode_mask, encode_mask, init_mask_with_rect, Class};
use segcut::{grab_cut, GrabCut, GrabCutConfig, InitMode, Label, Rect, SegmentError};

const BGD: u8 = 0;
const FGD: u8 = 1;
const PR_BGD: u8 = 2;
const PR_FGD: u8 = 3;

fn gray_image(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

/// Red square at (4..12, 4..12) on a blue field.
fn red_square() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, y| {
        if (4..12).contains(&x) && (4..12).contains(&y) {
            Rgb([220, 30, 40])
        } else {
            Rgb([20, 50, 210])
        }
    }))
}

#[test]
fn test_uniform_gray_with_centered_rect() {
    let img = gray_image(4, 4, 128);
    let mut mask = GrayImage::new(4, 4);
    let mut bgd_model = Vec::new();
    let mut fgd_model = Vec::new();

    grab_cut(
        &img,
        &mut mask,
        Rect::new(1, 1, 2, 2),
        &mut bgd_model,
        &mut fgd_model,
        1,
        InitMode::WithRect,
    )
    .unwrap();

    for y in 0..4 {
        for x in 0..4 {
            let inside = (1..3).contains(&x) && (1..3).contains(&y);
            if inside {
                // Both models see the same single color, so the data costs cancel and every
                // smoothness weight is zero: these nodes have no tie to either terminal.
                // The solver puts such free nodes on the source side, so they stay probable foreground.
                assert_eq!(mask.get_pixel(x, y)[0], PR_FGD, "pixel ({}, {})", x, y);
            } else {
                assert_eq!(mask.get_pixel(x, y)[0], BGD, "pixel ({}, {})", x, y);
            }
        }
    }
    assert_eq!(bgd_model.len(), PARAMS_LEN);
    assert_eq!(fgd_model.len(), PARAMS_LEN);
}

#[test]
fn test_invalid_mask_value_leaves_buffer_untouched() {
    let img = gray_image(3, 3, 90);
    let mut mask = GrayImage::from_pixel(3, 3, Luma([PR_BGD]));
    mask.put_pixel(0, 0, Luma([FGD]));
    mask.put_pixel(2, 1, Luma([99]));
    let before = mask.clone();
    let mut bgd_model = Vec::new();
    let mut fgd_model = Vec::new();

    let err = grab_cut(
        &img,
        &mut mask,
        Rect::default(),
        &mut bgd_model,
        &mut fgd_model,
        2,
        InitMode::WithMask,
    )
    .unwrap_err();

    assert!(matches!(err, SegmentError::InvalidMask(_)));
    assert_eq!(mask, before);
    assert!(bgd_model.is_empty());
    assert!(fgd_model.is_empty());
}

#[test]
fn test_zero_iterations_after_rect_init_keeps_mask() {
    let img = gray_image(6, 5, 40);
    let rect = Rect::new(1, 1, 3, 2);
    let mut mask = GrayImage::new(6, 5);
    encode_mask(&init_mask_with_rect(6, 5, rect), &mut mask);
    let snapshot = mask.clone();

    for mode in [InitMode::WithRect, InitMode::WithMask, InitMode::Eval] {
        let err = grab_cut(
            &img,
            &mut mask,
            rect,
            &mut Vec::new(),
            &mut Vec::new(),
            0,
            mode,
        )
        .unwrap_err();
        assert!(matches!(err, SegmentError::InvalidIterationCount(0)));
        assert_eq!(mask, snapshot);
    }

    let err = grab_cut(
        &img,
        &mut mask,
        rect,
        &mut Vec::new(),
        &mut Vec::new(),
        -3,
        InitMode::WithRect,
    )
    .unwrap_err();
    assert!(matches!(err, SegmentError::InvalidIterationCount(-3)));
    assert_eq!(mask, snapshot);
}

#[test]
fn test_rejects_bad_images() {
    let mut mask = GrayImage::new(0, 0);
    let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
    let err = grab_cut(
        &empty,
        &mut mask,
        Rect::default(),
        &mut Vec::new(),
        &mut Vec::new(),
        1,
        InitMode::WithRect,
    )
    .unwrap_err();
    assert!(matches!(err, SegmentError::InvalidImage(_)));

    let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
    let mut mask = GrayImage::from_pixel(4, 4, Luma([PR_FGD]));
    let err = grab_cut(
        &gray,
        &mut mask,
        Rect::new(0, 0, 2, 2),
        &mut Vec::new(),
        &mut Vec::new(),
        1,
        InitMode::WithRect,
    )
    .unwrap_err();
    assert!(matches!(err, SegmentError::InvalidImage(_)));
    assert_eq!(mask, GrayImage::from_pixel(4, 4, Luma([PR_FGD])));
}

#[test]
fn test_mask_dimensions_must_match() {
    let img = gray_image(4, 4, 10);
    let mut mask = GrayImage::from_pixel(3, 4, Luma([PR_FGD]));
    let err = grab_cut(
        &img,
        &mut mask,
        Rect::default(),
        &mut Vec::new(),
        &mut Vec::new(),
        1,
        InitMode::WithMask,
    )
    .unwrap_err();
    assert!(matches!(err, SegmentError::InvalidMask(_)));
}

#[test]
fn test_degenerate_rectangles() {
    let img = gray_image(5, 5, 77);

    let mut mask = GrayImage::new(5, 5);
    let err = grab_cut(
        &img,
        &mut mask,
        Rect::new(-1, -1, 10, 10),
        &mut Vec::new(),
        &mut Vec::new(),
        1,
        InitMode::WithRect,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SegmentError::DegenerateInitialization {
            class: Class::Background
        }
    ));

    let err = grab_cut(
        &img,
        &mut mask,
        Rect::new(7, 7, 2, 2),
        &mut Vec::new(),
        &mut Vec::new(),
        1,
        InitMode::WithRect,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SegmentError::DegenerateInitialization {
            class: Class::Foreground
        }
    ));
    // The rectangle mask was already written when seeding failed.
    assert!(mask.pixels().all(|p| p[0] == BGD));
}

#[test]
fn test_rejects_malformed_model_buffer() {
    let img = red_square();
    let mut mask = GrayImage::from_pixel(16, 16, Luma([PR_BGD]));
    let before = mask.clone();
    let mut bgd_model = vec![0.5; 10];
    let err = grab_cut(
        &img,
        &mut mask,
        Rect::default(),
        &mut bgd_model,
        &mut Vec::new(),
        1,
        InitMode::Eval,
    )
    .unwrap_err();
    assert!(matches!(err, SegmentError::InvalidModel(_)));
    assert_eq!(mask, before);
    assert_eq!(bgd_model, vec![0.5; 10]);
}

#[test]
fn test_separates_red_square_and_resumes() {
    let img = red_square();
    let mut mask = GrayImage::new(16, 16);
    let mut bgd_model = Vec::new();
    let mut fgd_model = Vec::new();

    grab_cut(
        &img,
        &mut mask,
        Rect::new(2, 2, 12, 12),
        &mut bgd_model,
        &mut fgd_model,
        3,
        InitMode::WithRect,
    )
    .unwrap();

    for y in 0..16 {
        for x in 0..16 {
            let red = (4..12).contains(&x) && (4..12).contains(&y);
            let in_rect = (2..14).contains(&x) && (2..14).contains(&y);
            let expected = match (in_rect, red) {
                (false, _) => BGD,
                (true, true) => PR_FGD,
                (true, false) => PR_BGD,
            };
            assert_eq!(mask.get_pixel(x, y)[0], expected, "pixel ({}, {})", x, y);
        }
    }

    // Resume from the saved models: a converged mask stays put.
    let converged = mask.clone();
    grab_cut(
        &img,
        &mut mask,
        Rect::default(),
        &mut bgd_model,
        &mut fgd_model,
        2,
        InitMode::Eval,
    )
    .unwrap();
    assert_eq!(mask, converged);
}

#[test]
fn test_hard_labels_survive_iterations() {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(12, 10, |x, y| {
        Rgb([
            ((x * 37 + y * 11) % 256) as u8,
            ((x * 5 + y * 53) % 256) as u8,
            ((x * y * 7) % 256) as u8,
        ])
    }));
    let mut mask = GrayImage::from_fn(12, 10, |x, y| {
        let v = match (x + 2 * y) % 7 {
            0 => BGD,
            1 => FGD,
            2 | 3 => PR_BGD,
            _ => PR_FGD,
        };
        Luma([v])
    });
    let before = mask.clone();

    grab_cut(
        &img,
        &mut mask,
        Rect::default(),
        &mut Vec::new(),
        &mut Vec::new(),
        4,
        InitMode::WithMask,
    )
    .unwrap();

    for (after, prior) in mask.pixels().zip(before.pixels()) {
        assert!(after[0] <= PR_FGD);
        if prior[0] == BGD || prior[0] == FGD {
            assert_eq!(after[0], prior[0]);
        } else {
            assert!(after[0] == PR_BGD || after[0] == PR_FGD);
        }
    }
}

/// Puts every node on the sink side and counts its calls.
///
/// The shared counter makes the backend neither `Sync` nor `Send`.
struct AllSink {
    calls: Rc<Cell<usize>>,
}

impl MinCutSolver for AllSink {
    fn min_cut(&mut self, network: &FlowNetwork) -> MinCut {
        self.calls.set(self.calls.get() + 1);
        MinCut {
            flow: 0.0,
            source_side: vec![false; network.node_count()],
        }
    }
}

/// Single-cluster seeding.
struct OneCluster {
    calls: Rc<Cell<usize>>,
}

impl Clusterer for OneCluster {
    fn cluster(&mut self, samples: &[Color], _k: usize) -> Vec<usize> {
        self.calls.set(self.calls.get() + 1);
        vec![0; samples.len()]
    }
}

#[test]
fn test_custom_backends() {
    let img = red_square();
    let rgb = img.as_rgb8().unwrap();
    let mut labels = init_mask_with_rect(16, 16, Rect::new(2, 2, 12, 12));
    labels[[0, 0]] = Label::Foreground;

    let cluster_calls = Rc::new(Cell::new(0));
    let cut_calls = Rc::new(Cell::new(0));
    let mut session = GrabCut::with_backends(
        GrabCutConfig::default(),
        OneCluster {
            calls: Rc::clone(&cluster_calls),
        },
        AllSink {
            calls: Rc::clone(&cut_calls),
        },
    );
    session.initialize(rgb, &labels).unwrap();
    assert_eq!(cluster_calls.get(), 2);
    let active = session
        .foreground()
        .components()
        .iter()
        .filter(|c| c.weight > 0.0)
        .count();
    assert_eq!(active, 1);

    session.run(rgb, &mut labels, 2).unwrap();
    assert_eq!(cut_calls.get(), 2);
    for (idx, label) in labels.iter().enumerate() {
        if idx == 0 {
            assert_eq!(*label, Label::Foreground);
        } else if label.is_probable() {
            assert_eq!(*label, Label::ProbableBackground);
        }
    }

    let mut out = GrayImage::new(1, 1);
    encode_mask(&labels, &mut out);
    assert_eq!(decode_mask(&out, 16, 16).unwrap(), labels);
}
