use super::*;

fn solid(width: u32, height: u32, rgba: [u8; 4], premultiplied: bool) -> FrameRGBA {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&rgba);
    }
    FrameRGBA {
        width,
        height,
        data,
        premultiplied,
    }
}

#[test]
fn inline_encoder_produces_decodable_png() {
    let frame = solid(4, 3, [10, 20, 30, 255], false);
    let bytes = InlinePngEncoder::new().submit(&frame).wait().unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

    let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 3));
    assert_eq!(img.get_pixel(2, 1).0, [10, 20, 30, 255]);
}

#[test]
fn premultiplied_frames_are_stored_straight() {
    let frame = solid(1, 1, [64, 32, 0, 128], true);
    let bytes = encode_png(&frame).unwrap();
    let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [128, 64, 0, 128]);
}

#[test]
fn threaded_encoder_resolves_through_wait() {
    let frame = solid(8, 8, [1, 2, 3, 255], false);
    let pending = PngFrameEncoder::new().submit(&frame);
    let bytes = pending.wait().unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

#[test]
fn malformed_frames_fail_to_encode() {
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0u8; 3],
        premultiplied: false,
    };
    let err = InlinePngEncoder::new().submit(&frame).wait().unwrap_err();
    assert!(matches!(err, FramecapError::Validation(_)));
}

#[test]
fn pending_frame_reports_empty_then_result() {
    let (done, pending) = PendingFrame::channel();
    assert!(pending.try_take().is_none());
    done.complete(Ok(vec![9]));
    assert_eq!(pending.try_take().unwrap().unwrap(), vec![9]);
}

#[test]
fn dropped_completer_is_a_frame_encode_failure() {
    let (done, pending) = PendingFrame::channel();
    drop(done);
    let err = pending.try_take().unwrap().unwrap_err();
    assert!(matches!(err, FramecapError::FrameEncode(_)));
}
