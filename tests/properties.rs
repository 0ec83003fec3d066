use echomesh::network::packet::PAYLOAD_LEN;
use echomesh::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;
use std::time::Duration;

fn stage(status: PacketStatus) -> u8 {
    match status {
        PacketStatus::Pending => 0,
        PacketStatus::Transit => 1,
        PacketStatus::Delivered | PacketStatus::Failed => 2,
    }
}

fn expected_stage(age_ms: u64) -> u8 {
    if age_ms < 1000 {
        0
    } else if age_ms < 3000 {
        1
    } else {
        2
    }
}

proptest! {
    #[test]
    fn status_never_goes_back(created in 0u64..10_000, mut steps in prop::collection::vec(0u64..20_000, 1..40)) {
        steps.sort();
        let mut packet = Packet::new(PacketId::new(0), 1, 2, 100, true, Duration::from_millis(created), [0; PAYLOAD_LEN]);
        let mut rng = StdRng::seed_from_u64(created);
        let mut terminal: Option<PacketStatus> = None;
        let mut last_stage = 0;

        for t in steps {
            packet.advance(Duration::from_millis(t), || rand::Rng::gen_bool(&mut rng, 0.5));
            let s = packet.status();
            prop_assert!(stage(s) >= last_stage);
            last_stage = stage(s);
            if let Some(done) = terminal {
                prop_assert_eq!(s, done);
            } else if s.is_terminal() {
                terminal = Some(s);
            }
        }
    }

    #[test]
    fn status_depends_only_on_age(age in 0u64..10_000, repeats in 1usize..10) {
        let mut packet = Packet::new(PacketId::new(0), 0, 1, 100, false, Duration::ZERO, [0; PAYLOAD_LEN]);
        for _ in 0..repeats {
            packet.advance(Duration::from_millis(age), || true);
        }
        prop_assert_eq!(stage(packet.status()), expected_stage(age));
    }

    #[test]
    fn counters_are_non_decreasing(seed in any::<u64>(), ops in prop::collection::vec((any::<bool>(), "[a-z ]{0,16}", any::<bool>()), 1..60)) {
        let mut dashboard = Dashboard::new(SimConfig::default().with_seed(seed));
        let mut prev = dashboard.stats();
        for (i, (ambient, content, encrypted)) in ops.into_iter().enumerate() {
            let now = Duration::from_millis(i as u64 * 250);
            let event = if ambient {
                Event::StatsTick
            } else {
                Event::Submit { content, encrypted }
            };
            dashboard.handle(event, now);
            let s = dashboard.stats();
            prop_assert!(s.packets_transmitted >= prev.packets_transmitted);
            prop_assert!(s.bytes_transferred >= prev.bytes_transferred);
            prev = s;
        }
    }

    #[test]
    fn message_log_is_append_only(seed in any::<u64>(), inputs in prop::collection::vec("[a-z ]{0,8}", 1..40)) {
        let mut dashboard = Dashboard::new(SimConfig::default().with_seed(seed));
        let mut seen: Vec<(u64, String)> = Vec::new();

        for (i, content) in inputs.into_iter().enumerate() {
            let now = Duration::from_millis(i as u64 * 1000);
            dashboard.handle(Event::Submit { content, encrypted: true }, now);
            dashboard.handle(Event::RemoteTick, now);

            let log = dashboard.messages().messages();
            prop_assert!(log.len() >= seen.len());
            for (old, current) in seen.iter().zip(log) {
                prop_assert_eq!(old.0, current.id);
                prop_assert_eq!(&old.1, &current.content);
            }
            seen = log.iter().map(|m| (m.id, m.content.clone())).collect();
        }
    }

    #[test]
    fn ring_positions_are_even(n in 1usize..32, width in 50.0f64..2000.0, height in 50.0f64..2000.0) {
        let topo = Topology::new(n, width, height);
        let c = topo.center();
        let r = topo.radius();
        let step = 2.0 * PI / n as f64;
        for (i, p) in topo.positions().into_iter().enumerate() {
            prop_assert!((p.distance(c) - r).abs() < 1e-6);
            let angle = (p.y - c.y).atan2(p.x - c.x).rem_euclid(2.0 * PI);
            let expected = (step * i as f64).rem_euclid(2.0 * PI);
            let diff = (angle - expected).abs();
            prop_assert!(diff < 1e-6 || (2.0 * PI - diff) < 1e-6);
        }
        prop_assert_eq!(topo.all_edges().len(), n * (n - 1) / 2);
    }
}
