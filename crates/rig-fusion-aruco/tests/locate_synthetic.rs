use approx::assert_relative_eq;
use nalgebra::{Matrix3, Point2, Vector3};
use rig_fusion_aruco::{
    rotate_code_u64, Dictionary, LocatorParams, MarkerLocator, SquareMarkerLocator,
};
use rig_fusion_core::{BgrImage, BrownConrady, CameraIntrinsics, GrayImage};

const BITS: usize = 5;

fn dictionary() -> Dictionary {
    Dictionary::new(
        "DICT_TEST_5X5",
        BITS,
        2,
        vec![0x1A5_C3E1, 0x0F3_0A96, 0x155_AA33, 0x0C6_3B5A],
    )
    .expect("dictionary")
}

fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics {
        width: 200,
        height: 200,
        fx: 500.0,
        fy: 500.0,
        ppx: 99.5,
        ppy: 99.5,
        distortion: BrownConrady::default(),
    }
}

/// White 200x200 frame with a 70 px marker whose outer corner is at (65, 65).
fn frame_with_marker(code: u64) -> BgrImage {
    let mut img = GrayImage::filled(200, 200, 255);
    let cell = 10;
    let cells = BITS + 2;
    for cy in 0..cells {
        for cx in 0..cells {
            let border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            let black = border || (code >> ((cy - 1) * BITS + (cx - 1))) & 1 == 1;
            if !black {
                continue;
            }
            for y in 0..cell {
                for x in 0..cell {
                    img.data[(65 + cy * cell + y) * 200 + 65 + cx * cell + x] = 0;
                }
            }
        }
    }
    BgrImage::from_gray(&img)
}

fn locator(target_id: Option<u32>) -> SquareMarkerLocator {
    let params = LocatorParams {
        marker_length: 0.14,
        target_id,
        ..LocatorParams::default()
    };
    SquareMarkerLocator::new(dictionary(), intrinsics(), params).expect("locator")
}

#[test]
fn fronto_parallel_marker_is_located_with_pose() {
    let dict = dictionary();
    let found = locator(None).locate(&frame_with_marker(dict.codes[2]));
    assert_eq!(found.len(), 1);

    let m = &found[0];
    assert_eq!(m.id, 2);
    assert_eq!(m.hamming, 0);
    let expected = [(64.5, 64.5), (134.5, 64.5), (134.5, 134.5), (64.5, 134.5)];
    for (c, (x, y)) in m.corners.iter().zip(expected) {
        assert_relative_eq!(c.x, x, epsilon = 1e-9);
        assert_relative_eq!(c.y, y, epsilon = 1e-9);
    }

    assert_relative_eq!(m.pose.translation, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
    let facing = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0));
    assert_relative_eq!(
        *m.pose.rotation.to_rotation_matrix().matrix(),
        facing,
        epsilon = 1e-9
    );
}

#[test]
fn rotated_marker_starts_at_its_own_top_left() {
    let dict = dictionary();
    let observed = rotate_code_u64(dict.codes[1], BITS, 1);
    let found = locator(None).locate(&frame_with_marker(observed));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 1);
    assert_eq!(found[0].corners[0], Point2::new(134.5, 64.5));
    assert_relative_eq!(found[0].pose.translation.z, 1.0, epsilon = 1e-9);
}

#[test]
fn target_id_filters_other_markers() {
    let dict = dictionary();
    let frame = frame_with_marker(dict.codes[0]);
    assert!(locator(Some(3)).locate(&frame).is_empty());
    assert_eq!(locator(Some(0)).locate(&frame).len(), 1);
}

#[test]
fn blank_frame_yields_nothing() {
    let blank = BgrImage::from_gray(&GrayImage::filled(200, 200, 255));
    assert!(locator(None).locate(&blank).is_empty());
}

#[test]
fn truncated_frame_yields_nothing() {
    let mut frame = frame_with_marker(dictionary().codes[0]);
    frame.data.truncate(frame.data.len() / 2);
    assert!(locator(None).locate(&frame).is_empty());

    let tiny = BgrImage {
        width: 10,
        height: 10,
        data: vec![0; 30],
    };
    assert!(locator(None).locate(&tiny).is_empty());
}

#[test]
fn locator_is_usable_through_a_trait_object() {
    let boxed: Box<dyn MarkerLocator> = Box::new(locator(None));
    let dict = dictionary();
    assert_eq!(boxed.locate(&frame_with_marker(dict.codes[3])).len(), 1);
}

#[test]
fn dictionary_file_is_required() {
    let err = SquareMarkerLocator::from_dictionary_file(
        "DICT_5X5_250",
        None,
        intrinsics(),
        LocatorParams::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("DICT_5X5_250"));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dict.json");
    std::fs::write(&path, serde_json::to_string(&dictionary()).expect("json")).expect("write");
    let loc = SquareMarkerLocator::from_dictionary_file(
        "DICT_TEST_5X5",
        Some(&path),
        intrinsics(),
        LocatorParams::default(),
    )
    .expect("locator");
    assert_eq!(loc.dictionary().codes.len(), 4);
}
