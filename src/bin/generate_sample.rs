use chrono::{Duration, NaiveTime};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // 60 s of IMU data at 100 Hz, with a 5 Hz tremor burst from 20 s to 35 s.
    let sample_rate = 100.0;
    let seconds = 60.0;
    let tremor_hz = 5.0;
    let burst = 20.0..35.0;

    let start = NaiveTime::from_hms_opt(8, 31, 20).expect("valid start time");

    let output_path = "sample_recording.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record(["Timestamp", "Yaw", "Pitch", "Roll", "Ax", "Ay", "Az"])
        .expect("Failed to write header");

    let total = (sample_rate * seconds) as usize;
    for i in 0..total {
        let t = i as f64 / sample_rate;
        let stamp = start + Duration::milliseconds((t * 1000.0) as i64);

        let tremor = if burst.contains(&t) {
            6.0 * (2.0 * std::f64::consts::PI * tremor_hz * t).sin()
        } else {
            0.0
        };
        // Slow voluntary motion plus the tremor component and sensor noise.
        let yaw = 15.0 * (0.1 * t).sin() + tremor + rng.gauss(0.0, 0.4);
        let pitch = 8.0 * (0.07 * t).cos() + 0.6 * tremor + rng.gauss(0.0, 0.4);
        let roll = 5.0 * (0.05 * t).sin() + 0.3 * tremor + rng.gauss(0.0, 0.4);
        let ax = rng.gauss(0.0, 0.02) + 0.01 * tremor;
        let ay = rng.gauss(0.0, 0.02);
        let az = 1.0 + rng.gauss(0.0, 0.02);

        writer
            .write_record([
                stamp.format("%H:%M:%S%.3f").to_string(),
                format!("{yaw:.3}"),
                format!("{pitch:.3}"),
                format!("{roll:.3}"),
                format!("{ax:.4}"),
                format!("{ay:.4}"),
                format!("{az:.4}"),
            ])
            .expect("Failed to write row");
    }

    writer.flush().expect("Failed to flush output file");
    println!("Wrote {total} samples ({seconds} s at {sample_rate} Hz) to {output_path}");
}
