use std::path::PathBuf;

use anyhow::{Context, Result};

const HOUSING_TYPES: [&str; 4] = ["아파트", "오피스텔", "다세대주택", "연립주택"];

const DISTRICTS: [(&str, f64, f64); 8] = [
    ("강남구 테헤란로", 37.5006, 127.0364),
    ("마포구 월드컵북로", 37.5663, 126.9019),
    ("송파구 올림픽로", 37.5145, 127.1059),
    ("관악구 관악로", 37.4784, 126.9516),
    ("노원구 동일로", 37.6542, 127.0568),
    ("강서구 공항대로", 37.5509, 126.8495),
    ("성동구 왕십리로", 37.5634, 127.0369),
    ("은평구 통일로", 37.6027, 126.9291),
];

const STATIONS: [&str; 8] = [
    "역삼역", "월드컵경기장역", "잠실역", "서울대입구역", "노원역", "발산역", "왕십리역", "연신내역",
];

/// Deterministic xoshiro256** generator, seeded through splitmix64.
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut x = seed;
        let state = [(); 4].map(|_| {
            x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = x;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^ (z >> 31)
        });
        SimpleRng { state }
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

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/final.csv"));
    let count: u64 = match std::env::args().nth(2) {
        Some(n) => n.parse().with_context(|| format!("invalid listing count '{n}'"))?,
        None => 200,
    };

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut rng = SimpleRng::new(42);
    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;

    writer.write_record([
        "번호",
        "주소",
        "주택유형",
        "m2",
        "deposit",
        "deposit_m2",
        "expected_time",
        "신청자수",
        "x",
        "y",
        "nearest_station",
        "station_distance",
        "image",
    ])?;

    for id in 1..=count {
        let (street, lat, lon) = *rng.pick(&DISTRICTS);
        let station = rng.pick(&STATIONS).to_string();
        let housing_type = rng.pick(&HOUSING_TYPES).to_string();

        let area = (rng.range(18.0, 85.0) * 100.0).round() / 100.0;
        let deposit = (area * rng.range(180.0, 420.0) / 100.0).round() * 100.0;
        let commute = rng.range(15.0, 110.0);
        // Roughly one listing in ten has no commute estimate yet.
        let expected_time = if rng.next_f64() < 0.1 {
            String::new()
        } else {
            format!("{commute:.1}")
        };

        writer.write_record([
            id.to_string(),
            format!("서울특별시 {street} {}", 10 + rng.next_u64() % 400),
            housing_type,
            format!("{area:.2}"),
            format!("{deposit:.0}"),
            format!("{:.2}", deposit / area),
            expected_time,
            (rng.next_u64() % 60).to_string(),
            format!("{:.6}", lat + rng.range(-0.02, 0.02)),
            format!("{:.6}", lon + rng.range(-0.02, 0.02)),
            station,
            format!("{:.0}", rng.range(80.0, 1500.0)),
            String::new(),
        ])?;
    }
    writer.flush()?;

    println!("Wrote {count} listings to {}", output_path.display());
    Ok(())
}
