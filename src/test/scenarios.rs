//! 端到端场景：固定故障轨迹下三种协议的重传行为。

use crate::arq::Protocol;
use crate::net::ScriptedFaults;
use crate::sim::{RunReport, SimConfig, Simulation};

const MESSAGE: &[u8] = b"HelloWorld";

fn config(protocol: Protocol, window: usize) -> SimConfig {
    SimConfig {
        protocol,
        chunk_size: 2,
        window_size: window,
        timeout_us: 5_000,
        tick_us: 1_000,
        ..SimConfig::default()
    }
}

fn run_scripted(protocol: Protocol, window: usize, script: ScriptedFaults) -> (RunReport, Vec<u64>) {
    let mut sim = Simulation::with_faults(MESSAGE, &config(protocol, window), Box::new(script))
        .expect("valid config")
        .with_trace();
    let report = sim.run_to_completion();
    assert_eq!(sim.reassembled(), MESSAGE);
    let resent = sim.retransmitted_seqs();
    (report, resent)
}

#[test]
fn hello_world_without_faults_needs_no_retransmissions() {
    for protocol in [Protocol::GoBackN, Protocol::SelectiveRepeat] {
        let (report, resent) = run_scripted(protocol, 2, ScriptedFaults::new());
        assert!(report.success, "{protocol}");
        assert_eq!(report.stats.total_sent, 5);
        assert_eq!(report.stats.retransmissions, 0);
        assert_eq!(report.stats.useful_packets, 5);
        assert_eq!(report.stats.efficiency, 1.0);
        assert!(resent.is_empty());
    }
}

#[test]
fn dropping_packet_two_go_back_n_resends_from_base_onward() {
    let (report, resent) = run_scripted(Protocol::GoBackN, 3, ScriptedFaults::new().lose_packet(2, 1));
    assert!(report.success);
    assert_eq!(resent, vec![2, 3, 4]);
    assert_eq!(report.stats.retransmissions, 3);
    assert_eq!(report.stats.total_sent, 8);
}

#[test]
fn dropping_packet_two_selective_repeat_resends_only_it() {
    let (report, resent) = run_scripted(
        Protocol::SelectiveRepeat,
        3,
        ScriptedFaults::new().lose_packet(2, 1),
    );
    assert!(report.success);
    assert_eq!(resent, vec![2]);
    assert_eq!(report.stats.retransmissions, 1);
    assert_eq!(report.stats.total_sent, 6);
}

#[test]
fn window_of_two_go_back_n_resends_the_in_flight_pair() {
    // 窗口为 2 时，丢包那一刻在途的只有 {2, 3}
    let (gbn, gbn_resent) = run_scripted(Protocol::GoBackN, 2, ScriptedFaults::new().lose_packet(2, 1));
    let (sr, sr_resent) = run_scripted(
        Protocol::SelectiveRepeat,
        2,
        ScriptedFaults::new().lose_packet(2, 1),
    );
    assert_eq!(gbn_resent, vec![2, 3]);
    assert_eq!(sr_resent, vec![2]);
    assert!(gbn.stats.retransmissions >= sr.stats.retransmissions);
}

#[test]
fn selective_repeat_never_resends_more_than_go_back_n_for_single_loss() {
    let msg_packets = 5u64;
    for window in 1..=5usize {
        for lost in 0..msg_packets {
            let (gbn, _) = run_scripted(
                Protocol::GoBackN,
                window,
                ScriptedFaults::new().lose_packet(lost, 1),
            );
            let (sr, sr_resent) = run_scripted(
                Protocol::SelectiveRepeat,
                window,
                ScriptedFaults::new().lose_packet(lost, 1),
            );
            assert_eq!(sr_resent, vec![lost], "window={window} lost={lost}");
            assert!(
                gbn.stats.retransmissions >= sr.stats.retransmissions,
                "window={window} lost={lost}"
            );
        }
    }
}

#[test]
fn corrupted_packet_is_rejected_then_recovered() {
    for protocol in [Protocol::StopAndWait, Protocol::GoBackN, Protocol::SelectiveRepeat] {
        let mut sim = Simulation::with_faults(
            MESSAGE,
            &config(protocol, 2),
            Box::new(ScriptedFaults::new().corrupt_packet(1, 1)),
        )
        .expect("valid config")
        .with_trace();
        let report = sim.run_to_completion();
        assert!(report.success, "{protocol}");
        assert_eq!(report.stats.net.packets_corrupted, 1);
        let trace = sim.trace().expect("trace enabled");
        let rejected_integrity = trace.count(|k| {
            matches!(k, crate::trace::TraceEventKind::Rejected { seq: 1, reason } if reason.contains("integrity"))
        });
        assert_eq!(rejected_integrity, 1, "{protocol}");
        assert!(trace.retransmitted_seqs().contains(&1));
    }
}

#[test]
fn lost_ack_is_repaired_by_duplicate_reack() {
    // Stop-and-Wait：ACK 0 丢失，超时重传的包 0 被当作重复包，重新确认后继续
    let (report, resent) = run_scripted(Protocol::StopAndWait, 1, ScriptedFaults::new().lose_ack(0, 1));
    assert!(report.success);
    assert_eq!(resent, vec![0]);
    assert_eq!(report.stats.net.acks_lost, 1);
}

#[test]
fn go_back_n_later_cumulative_ack_covers_a_lost_one() {
    // ACK 0 丢失，但 ACK 1 是累计确认，不需要任何重传
    let (report, resent) = run_scripted(Protocol::GoBackN, 4, ScriptedFaults::new().lose_ack(0, 1));
    assert!(report.success);
    assert!(resent.is_empty());
    assert_eq!(report.stats.total_sent, 5);
}

#[test]
fn selective_repeat_lost_ack_resends_just_that_packet() {
    let (report, resent) = run_scripted(
        Protocol::SelectiveRepeat,
        4,
        ScriptedFaults::new().lose_ack(1, 1),
    );
    assert!(report.success);
    assert_eq!(resent, vec![1]);
}
