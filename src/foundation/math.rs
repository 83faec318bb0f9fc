/// `x / 255` rounded to nearest, saturating at 255.
pub(crate) fn div255_round(x: u32) -> u8 {
    ((x + 127) / 255).min(255) as u8
}

/// Inverse of premultiplication for one channel, rounded to nearest.
pub(crate) fn unpremul_channel(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let a = u32::from(a);
    ((u32::from(c) * 255 + a / 2) / a).min(255) as u8
}

/// Convert tightly packed premultiplied RGBA8 into straight-alpha RGBA8.
pub(crate) fn unpremultiply_rgba8(dst: &mut [u8], src_premul: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3];
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        d[0] = unpremul_channel(s[0], a);
        d[1] = unpremul_channel(s[1], a);
        d[2] = unpremul_channel(s[2], a);
        d[3] = a;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
