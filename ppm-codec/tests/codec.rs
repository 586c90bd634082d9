use ppm_codec::{
    decode, encode, interval_ticks, u10, Calibration, DeltaSigma, Encoder,
    LineCode, PdmEncoder, PdmLine, PpmEncoder, Resolution,
};

/// One quantization step of a 16 bit sample spread over 1024 codes.
const STEP16: i32 = 65536 / 1024;

#[test]
fn roundtrip_16bit_exhaustive() {
    let r = Resolution::Bits16;
    let mut previous = 0;
    for s in i16::MIN..=i16::MAX {
        let s = s as i32;
        let code = encode(s, r);
        assert!(code.value() >= previous, "encode not monotonic at {s}");
        previous = code.value();
        let y = decode(code, r);
        assert!((y - s).abs() <= STEP16, "{s} -> {code} -> {y}");
    }
}

#[test]
fn decode_monotonic() {
    for r in [Resolution::Bits16, Resolution::Bits24] {
        let mut previous = i32::MIN;
        for c in 0..=1023u16 {
            let y = decode(u10::new(c), r);
            assert!(y > previous, "decode not monotonic at {c}");
            previous = y;
        }
        assert_eq!(previous, r.max());
    }
}

#[test]
fn roundtrip_24bit() {
    let r = Resolution::Bits24;
    let step = (1 << 24) / 1024;
    // Prime stride visits all residues of the quantization step.
    for s in (r.min()..=r.max()).step_by(4093) {
        let y = decode(encode(s, r), r);
        assert!((y - s).abs() <= step, "{s} -> {y}");
    }
    assert_eq!(encode(r.min(), r).value(), 0);
    assert_eq!(encode(0, r).value(), 511);
    assert_eq!(encode(r.max(), r).value(), 1023);
}

#[test]
fn width_identity() {
    for cal in [
        Calibration::new(10, interval_ticks(250_000, 3_000, 2), 1024),
        Calibration::new(5, interval_ticks(133_000, 3_000, 2), 1024),
    ] {
        for c in 0..=1023u16 {
            let code = u10::new(c);
            let measured = cal.ideal_measurement(cal.width_sent(code));
            assert_eq!(cal.corrected_width(measured), c as i64);
            let accepted = cal.accept(measured).map(u10::value);
            // Code 0 coincides with the noise floor.
            assert_eq!(accepted, (c > 0).then_some(c));
        }
    }
}

#[test]
fn ppm_encoder_is_line_code() {
    let cal = Calibration::new(10, 375, 1024);
    let mut e = PpmEncoder::new(Resolution::Bits16);
    let word = e.push(0).unwrap();
    assert_eq!(cal.symbol(word), 375 + 511);
    assert_eq!(<Calibration as LineCode>::TICKS_PER_SYMBOL, 1);
}

fn density(x: i32, words: usize) -> f64 {
    let r = Resolution::Bits16;
    let mut d = DeltaSigma::default();
    let ones: u32 = (0..words)
        .map(|_| d.modulate(&[x; 32], r).count_ones())
        .sum();
    ones as f64 / (32 * words) as f64
}

#[test]
fn pdm_density_tracks_input() {
    for (x, expect) in [(0, 0.5), (16384, 0.75), (-16384, 0.25)] {
        let p = density(x, 256);
        assert!((p - expect).abs() < 0.01, "{x}: {p} != {expect}");
    }
}

#[test]
fn pdm_encoder_matches_modulator() {
    let r = Resolution::Bits16;
    let samples: Vec<i32> = (0..64).map(|i| (i * 997 % 4001) - 2000).collect();
    let mut d = DeltaSigma::default();
    let expect = [d.modulate(&samples[..32], r), d.modulate(&samples[32..], r)];

    let mut e = PdmEncoder::new(r);
    let words: Vec<u32> = samples.iter().filter_map(|&x| e.push(x)).collect();
    assert_eq!(words, expect);

    // Reconfiguration drops the partial word and the modulator state.
    e.push(12345);
    e.configure(r);
    let words: Vec<u32> = samples.iter().filter_map(|&x| e.push(x)).collect();
    assert_eq!(words, expect);
    assert_eq!(PdmLine.idle().count_ones(), 16);
}
