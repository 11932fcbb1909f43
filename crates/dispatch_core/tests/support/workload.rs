use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random but reproducible command stream: creations at non-decreasing times
/// mixed with cancels, delivery-time changes and queries on known ids.
pub fn random_script(seed: u64, commands: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut script = Vec::with_capacity(commands + 1);
    let mut now: i64 = 0;
    let mut next_id: u64 = 1;

    for _ in 0..commands {
        let roll: u32 = rng.gen_range(0..100);
        if roll < 55 || next_id == 1 {
            now += rng.gen_range(0..4);
            script.push(format!(
                "createOrder({}, {}, {}, {})",
                next_id,
                now,
                rng.gen_range(10..1000),
                rng.gen_range(1..10)
            ));
            next_id += 1;
            continue;
        }

        let target = rng.gen_range(1..next_id);
        let line = match roll {
            55..=69 => format!("cancelOrder({target}, {now})"),
            70..=84 => format!("updateTime({target}, {now}, {})", rng.gen_range(1..10)),
            85..=89 => format!("print({target})"),
            90..=94 => format!("print({}, {})", now, now + rng.gen_range(0..20)),
            _ => format!("getRankOfOrder({target})"),
        };
        script.push(line);
    }
    script.push("Quit()".to_string());
    script
}
