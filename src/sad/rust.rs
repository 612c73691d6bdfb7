use std::num::NonZeroUsize;

pub fn get_sad<const N: usize>(
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
) -> u64 {
    let mut sum = 0;
    for y in 0..N {
        let src_row = &src[y * src_pitch.get()..][..N];
        let ref_row = &ref_[y * ref_pitch.get()..][..N];
        for x in 0..N {
            sum += u64::from(src_row[x].abs_diff(ref_row[x]));
        }
    }
    sum
}
