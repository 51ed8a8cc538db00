use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::arq::Packet;
use crate::error::ConfigError;
use crate::net::{FaultConfig, Network, Probability, RandomFaults, ScriptedFaults, Transit};

fn random_net(packet_loss: f64, corruption: f64, ack_loss: f64, seed: u64) -> Network {
    let cfg = FaultConfig::new(packet_loss, corruption, ack_loss);
    Network::new(Box::new(RandomFaults::new(&cfg, seed).expect("valid faults")))
}

#[test]
fn probability_rejects_nan_and_out_of_range() {
    assert_eq!(Probability::new("p", 0.0).map(Probability::value), Ok(0.0));
    assert_eq!(Probability::new("p", 0.25).map(Probability::value), Ok(0.25));
    assert_eq!(Probability::new("p", 1.0), Ok(Probability::ALWAYS));
    assert_eq!(
        Probability::new("p", 1.5),
        Err(ConfigError::InvalidProbability {
            name: "p",
            value: 1.5
        })
    );
    assert!(Probability::new("p", -0.1).is_err());
    assert!(Probability::new("p", f64::NAN).is_err());
}

#[test]
fn probability_formats_as_percent() {
    assert_eq!(Probability::new("p", 0.05).expect("valid").to_string(), "5%");
    assert_eq!(Probability::new("p", 0.123).expect("valid").to_string(), "12.30%");
}

#[test]
fn probability_extremes_sample_deterministically() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..1000 {
        assert!(!Probability::NEVER.sample(&mut rng));
        assert!(Probability::ALWAYS.sample(&mut rng));
    }
}

#[test]
fn fault_config_validation_names_the_bad_field() {
    let err = FaultConfig::new(0.1, 2.0, 0.0).validate().expect_err("invalid");
    assert_eq!(
        err,
        ConfigError::InvalidProbability {
            name: "corruption",
            value: 2.0
        }
    );
    assert!(RandomFaults::new(&FaultConfig::new(0.0, 0.0, -1.0), 0).is_err());
}

#[test]
fn lossless_network_queues_intact_copies_in_order() {
    let mut net = random_net(0.0, 0.0, 0.0, 1);
    for seq in 0..5 {
        let pkt = Packet::new(seq, vec![seq as u8; 3]);
        assert_eq!(net.transmit_packet(&pkt), Transit::Queued { corrupted: false });
    }
    assert_eq!(net.in_transit(), 5);
    for seq in 0..5 {
        let pkt = net.next_delivery().expect("queued");
        assert_eq!(pkt.seq, seq);
        assert!(pkt.verify());
    }
    assert!(net.is_idle());
    assert!(net.transmit_ack(3));
    assert_eq!(net.stats.packets_delivered, 5);
    assert_eq!(net.stats.acks_lost, 0);
}

#[test]
fn total_loss_drops_everything() {
    let mut net = random_net(1.0, 0.0, 1.0, 7);
    let pkt = Packet::new(0, b"xy".to_vec());
    for _ in 0..100 {
        assert_eq!(net.transmit_packet(&pkt), Transit::Lost);
        assert!(!net.transmit_ack(0));
    }
    assert!(net.is_idle());
    assert_eq!(net.stats.packets_lost, 100);
    assert_eq!(net.stats.acks_lost, 100);
}

#[test]
fn corruption_touches_the_copy_not_the_original() {
    let mut net = random_net(0.0, 1.0, 0.0, 3);
    let original = Packet::new(4, b"payload-bytes".to_vec());
    assert_eq!(net.transmit_packet(&original), Transit::Queued { corrupted: true });
    let copy = net.next_delivery().expect("queued");
    assert!(original.verify());
    assert_eq!(copy.len(), original.len());
    assert_eq!(copy.digest(), original.digest());
    assert!(!copy.verify());
}

#[test]
fn corruption_is_only_counted_when_bytes_change() {
    // 单字节载荷时随机替换有 1/256 的概率与原值相同
    let mut net = random_net(0.0, 1.0, 0.0, 17);
    let pkt = Packet::new(0, vec![0x5a]);
    let mut corrupted = 0u64;
    for _ in 0..5_000 {
        let Transit::Queued { corrupted: hit } = net.transmit_packet(&pkt) else {
            panic!("lossless link dropped a packet");
        };
        let copy = net.next_delivery().expect("queued");
        assert_eq!(copy.verify(), !hit);
        corrupted += u64::from(hit);
    }
    assert!(corrupted < 5_000);
    assert!(corrupted > 4_800);
    assert_eq!(net.stats.packets_corrupted, corrupted);
}

#[test]
fn random_loss_rate_is_roughly_respected() {
    let mut net = random_net(0.3, 0.0, 0.0, 99);
    let pkt = Packet::new(0, b"ab".to_vec());
    let lost = (0..10_000)
        .filter(|_| net.transmit_packet(&pkt) == Transit::Lost)
        .count();
    assert!((2_500..3_500).contains(&lost), "lost={lost}");
}

#[test]
fn same_seed_same_fault_sequence() {
    let pkt = Packet::new(0, b"ab".to_vec());
    let run = |seed| {
        let mut net = random_net(0.5, 0.5, 0.5, seed);
        (0..200)
            .map(|i| (net.transmit_packet(&pkt), net.transmit_ack(i)))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(11), run(11));
    assert_ne!(run(11), run(12));
}

#[test]
fn scripted_faults_fire_exactly_as_written() {
    let script = ScriptedFaults::new()
        .lose_packet(2, 1)
        .corrupt_packet(3, 2)
        .lose_ack(1, 1)
        .lose_packet(9, 0);
    assert!(!script.is_exhausted());
    let mut net = Network::new(Box::new(script));

    let p2 = Packet::new(2, b"cd".to_vec());
    let p3 = Packet::new(3, b"ef".to_vec());
    assert_eq!(net.transmit_packet(&p2), Transit::Lost);
    assert_eq!(net.transmit_packet(&p2), Transit::Queued { corrupted: false });
    assert_eq!(net.transmit_packet(&p3), Transit::Queued { corrupted: true });
    assert_eq!(net.transmit_packet(&p3), Transit::Queued { corrupted: true });
    assert_eq!(net.transmit_packet(&p3), Transit::Queued { corrupted: false });

    assert!(net.transmit_ack(0));
    assert!(!net.transmit_ack(1));
    assert!(net.transmit_ack(1));

    let delivered: Vec<bool> = std::iter::from_fn(|| net.next_delivery())
        .map(|p| p.verify())
        .collect();
    assert_eq!(delivered, vec![true, false, false, true]);
}
