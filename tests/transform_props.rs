use proptest::prelude::*;
use screen_qr::models::{Frame, PixelFormat};
use screen_qr::transform::resample::scaled_side;
use screen_qr::transform::{TransformKind, TransformParams, invert, rescale, to_grayscale};

const ALL_KINDS: [TransformKind; 6] = [
    TransformKind::Grayscale,
    TransformKind::Otsu,
    TransformKind::Adaptive,
    TransformKind::Clahe,
    TransformKind::Sharpen,
    TransformKind::Invert,
];

fn rgb_frame_strategy() -> impl Strategy<Value = Frame> {
    (1usize..32, 1usize..32).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), w * h * 3)
            .prop_map(move |data| Frame::from_rgb(w, h, data).unwrap())
    })
}

fn luma_frame_strategy() -> impl Strategy<Value = Frame> {
    (1usize..32, 1usize..32).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), w * h)
            .prop_map(move |data| Frame::from_luma(w, h, data).unwrap())
    })
}

proptest! {
    #[test]
    fn test_every_transform_keeps_dimensions(frame in rgb_frame_strategy()) {
        let params = TransformParams::default();
        for kind in ALL_KINDS {
            let out = kind.apply(&frame, &params).unwrap();
            prop_assert_eq!((out.width(), out.height()), (frame.width(), frame.height()));
        }
    }

    #[test]
    fn test_binarizers_emit_two_levels(frame in rgb_frame_strategy()) {
        let params = TransformParams::default();
        for kind in [TransformKind::Otsu, TransformKind::Adaptive] {
            let out = kind.apply(&frame, &params).unwrap();
            prop_assert_eq!(out.format(), PixelFormat::Luma8);
            prop_assert!(out.as_bytes().iter().all(|&v| v == 0 || v == 255));
        }
    }

    #[test]
    fn test_double_invert_is_identity(frame in rgb_frame_strategy()) {
        let twice = invert(&invert(&frame).unwrap()).unwrap();
        prop_assert_eq!(twice, frame);
    }

    #[test]
    fn test_grayscale_of_luma_is_unchanged(frame in luma_frame_strategy()) {
        let gray = to_grayscale(&frame).unwrap();
        prop_assert_eq!(gray, frame);
    }

    #[test]
    fn test_rescale_matches_scaled_side(
        frame in luma_frame_strategy(),
        factor in prop_oneof![Just(0.5f32), Just(2.0f32), 0.25f32..4.0],
    ) {
        let out = rescale(&frame, factor).unwrap();
        prop_assert_eq!(out.width(), scaled_side(frame.width(), factor));
        prop_assert_eq!(out.height(), scaled_side(frame.height(), factor));
        prop_assert_eq!(out.format(), frame.format());
    }
}
