//! Testing Chipd's threaded daemon through its public API
use chipd::{journal::Reader, prelude::*};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::sleep,
    time::{Duration, Instant},
};

/// Waits up to a second for `condition` to hold
fn wait_for(daemon: &Daemon, condition: impl Fn(&Daemon) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if condition(daemon) {
            return true;
        }
        sleep(Duration::from_millis(1));
    }
    condition(daemon)
}

fn fast() -> (Daemon, Reader) {
    Daemon::with_journal(Config {
        clock_speed: 100_000,
        journal_capacity: 4096,
        ..Default::default()
    })
}

#[test]
fn starts_paused() {
    let (daemon, _reader) = fast();
    daemon.load_rom(vec![0x12, 0x00]);
    assert!(wait_for(&daemon, |d| d.pending() == 0));
    sleep(Duration::from_millis(20));
    assert_eq!(RunState::Paused, daemon.state());
    assert_eq!(0, daemon.cycle());
}

#[test]
fn golden_trace() {
    #[rustfmt::skip]
    let rom = vec![
        0x60, 0x05, // 200: ld v0, 05
        0x61, 0x07, // 202: ld v1, 07
        0x80, 0x14, // 204: add v0, v1
        0xa3, 0x00, // 206: ld i, 300
        0xf0, 0x33, // 208: ld b, v0
        0x12, 0x0a, // 20a: jp 20a
    ];
    let (daemon, _reader) = fast();
    daemon.load_rom(rom);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.cycle() >= 10));
    daemon.pause();
    assert!(wait_for(&daemon, |d| d.state() == RunState::Paused));
    let cpu = daemon.snapshot();
    assert_eq!(12, cpu.v()[0]);
    assert_eq!(7, cpu.v()[1]);
    assert_eq!(0, cpu.v()[0xf]);
    assert_eq!(0x300, cpu.i());
    assert_eq!(0x20a, cpu.pc());
    assert_eq!([0u8, 1, 2], cpu.memory()[0x300..0x303]);
    assert_eq!(Some("JP   0x20A".into()), daemon.disassemble(0x20a));
}

#[test]
fn oversized_rom_is_rejected() {
    let (daemon, reader) = fast();
    daemon.load_rom_at(vec![0xaa; 0x10], 0xff8);
    assert!(wait_for(&daemon, |d| d.pending() == 0));
    sleep(Duration::from_millis(5));
    // memory is as reset left it
    let cpu = daemon.snapshot();
    assert!(cpu.memory()[0xff8..].iter().all(|&byte| byte == 0));
    assert!(reader
        .drain()
        .any(|entry| entry.level == log::Level::Error && entry.message.contains("does not fit")));
}

#[test]
fn commands_apply_in_order() {
    let (daemon, _reader) = fast();
    daemon.key_down(3);
    daemon.key_up(3);
    daemon.key_down(4);
    assert!(wait_for(&daemon, |d| d.pending() == 0));
    sleep(Duration::from_millis(5));
    let keys = daemon.snapshot().keys();
    assert!(!keys[3]);
    assert!(keys[4]);
}

#[test]
fn key_press_ends_wait() {
    #[rustfmt::skip]
    let rom = vec![
        0xf5, 0x0a, // 200: ld v5, k
        0x12, 0x02, // 202: jp 202
    ];
    let (daemon, _reader) = fast();
    daemon.load_rom(rom);
    daemon.run();
    assert!(wait_for(&daemon, Daemon::is_waiting));
    assert_eq!(0x202, daemon.pc());
    daemon.key_down(0xb);
    assert!(wait_for(&daemon, |d| d.v()[5] == 0xb));
    assert!(wait_for(&daemon, |d| !d.is_waiting()));
}

#[test]
fn clock_speed() {
    let (daemon, reader) = fast();
    assert_eq!(100_000, daemon.clock_speed());
    daemon.set_clock_speed(0);
    daemon.set_clock_speed(60);
    assert!(wait_for(&daemon, |d| d.clock_speed() == 60));
    assert!(reader
        .drain()
        .any(|entry| entry.level == log::Level::Warn));
}

#[test]
fn step_while_paused() {
    let (daemon, _reader) = fast();
    daemon.load_rom(vec![0x60, 0x01, 0x70, 0x01]);
    daemon.step();
    assert!(wait_for(&daemon, |d| d.cycle() == 1));
    assert_eq!(1, daemon.v()[0]);
    daemon.step();
    assert!(wait_for(&daemon, |d| d.cycle() == 2));
    assert_eq!(2, daemon.v()[0]);
    assert_eq!(RunState::Paused, daemon.state());
}

#[test]
fn fault_pauses_and_is_observable() {
    let (daemon, reader) = fast();
    // 200: ret, with nothing on the stack
    daemon.load_rom(vec![0x00, 0xee]);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.fault().is_some()));
    assert_eq!(Some(Error::StackUnderflow { addr: 0x200 }), daemon.fault());
    assert_eq!(RunState::Paused, daemon.state());
    assert_eq!(0x200, daemon.pc());
    assert!(reader
        .drain()
        .any(|entry| entry.level == log::Level::Error && entry.source == "cpu"));
    // loading a new program clears the fault
    daemon.load_rom(vec![0x12, 0x00]);
    assert!(wait_for(&daemon, |d| d.fault().is_none()));
}

#[test]
fn reset_reloads_the_program() {
    let (daemon, _reader) = fast();
    daemon.load_rom(vec![0x60, 0x2a, 0x12, 0x02]);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.v()[0] == 0x2a));
    daemon.pause();
    daemon.reset();
    assert!(wait_for(&daemon, |d| d.cycle() == 0));
    let cpu = daemon.snapshot();
    assert_eq!(0, cpu.v()[0]);
    assert_eq!(0x200, cpu.pc());
    assert_eq!(Ok(0x602a), cpu.read_u16(0x200));
}

#[test]
fn handlers_run_in_registration_order() {
    let (daemon, _reader) = fast();
    let order = Arc::new(Mutex::new(vec![]));
    for name in ["first", "second"] {
        let order = Arc::clone(&order);
        daemon.register_handler(CommandKind::Reset, move |core, _| {
            // the built-in handler has already run
            assert_eq!(0, core.cpu.cycle());
            order.lock().unwrap().push(name);
        });
    }
    daemon.reset();
    assert!(wait_for(&daemon, |_| order.lock().unwrap().len() == 2));
    assert_eq!(["first", "second"], order.lock().unwrap()[..]);
}

#[test]
fn custom_commands() {
    let (daemon, reader) = fast();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    daemon.register_handler(CommandKind::Custom("poke"), move |core, command| {
        if let Command::Custom { payload, .. } = command {
            core.cpu.set_v(payload[0] as usize, payload[1]);
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    daemon.send(Command::Custom {
        tag: "poke",
        payload: vec![0x7, 0x99],
    });
    // nobody listens for this one
    daemon.send(Command::Custom {
        tag: "ignored",
        payload: vec![],
    });
    assert!(wait_for(&daemon, |d| d.v()[7] == 0x99));
    assert!(wait_for(&daemon, |d| d.pending() == 0));
    sleep(Duration::from_millis(5));
    assert_eq!(1, seen.load(Ordering::SeqCst));
    assert!(reader
        .drain()
        .any(|entry| entry.level == log::Level::Warn && entry.message.contains("ignored")));
}

#[test]
fn draws_are_never_torn() {
    #[rustfmt::skip]
    let rom = vec![
        0xa0, 0x00, // 200: ld i, 000 ("0")
        0xd0, 0x05, // 202: drw v0, v0, 5
        0x12, 0x02, // 204: jp 202
    ];
    let (daemon, _reader) = fast();
    daemon.load_rom(rom);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.cycle() > 2));
    // "0" is 0xf0 0x90 0x90 0x90 0xf0: the screen holds all of it, or none of it
    for _ in 0..200 {
        let lit = daemon
            .framebuffer()
            .iter()
            .filter(|&&pixel| pixel)
            .count();
        assert!(lit == 0 || lit == 14, "{lit} pixels lit");
    }
}

#[test]
fn hires_framebuffer() {
    #[rustfmt::skip]
    let rom = vec![
        0x00, 0xff, // 200: high
        0x60, 0x7f, // 202: ld v0, 7f
        0x61, 0x3f, // 204: ld v1, 3f
        0xa3, 0x00, // 206: ld i, 300
        0xd0, 0x11, // 208: drw v0, v1, 1
        0x12, 0x0a, // 20a: jp 20a
    ];
    let (daemon, _reader) = fast();
    let mut rom = rom;
    rom.resize(0x100, 0);
    rom.push(0x80); // 300
    daemon.load_rom(rom);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.pc() == 0x20a && d.cycle() > 5));
    assert_eq!(ScreenMode::Extended, daemon.screen_mode());
    assert!(daemon.pixel(127, 63));
    assert!(!daemon.pixel(0, 0));
}

#[test]
fn exit_is_reported() {
    let (daemon, _reader) = fast();
    daemon.load_rom(vec![0x00, 0xfd]);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.fault().is_some()));
    assert_eq!(Some(Error::Exited { addr: 0x200 }), daemon.fault());
}

#[test]
fn timers_count_down_while_running() {
    #[rustfmt::skip]
    let rom = vec![
        0x60, 0x0a, // 200: ld v0, 0a
        0xf0, 0x15, // 202: ld dt, v0
        0x12, 0x04, // 204: jp 204
    ];
    let (daemon, _reader) = fast();
    daemon.load_rom(rom);
    daemon.run();
    assert!(wait_for(&daemon, |d| d.pc() == 0x204));
    assert!(wait_for(&daemon, |d| d.delay() == 0));
}

#[test]
fn trace_journals_each_instruction() {
    let (log, reader) = journal(4096);
    let daemon = Daemon::new(
        Config {
            clock_speed: 100_000,
            trace: true,
            ..Default::default()
        },
        log,
    );
    daemon.load_rom(vec![0x61, 0x23, 0x12, 0x02]);
    daemon.step();
    assert!(wait_for(&daemon, |d| d.cycle() == 1));
    let traces: Vec<String> = reader
        .drain()
        .filter(|entry| entry.level == log::Level::Trace)
        .map(|entry| entry.message)
        .collect();
    assert_eq!(["200: LD   V1, 0x23"], traces[..]);
}

#[test]
fn shutdown_joins_the_worker() {
    let (daemon, reader) = fast();
    daemon.run();
    daemon.shutdown();
    assert!(reader.drain().any(|entry| entry.message == "stopped"));
}

#[test]
fn panicking_handler_keeps_the_worker_alive() {
    let (daemon, reader) = fast();
    daemon.register_handler(CommandKind::Custom("boom"), |_, _| panic!("boom"));
    daemon.send(Command::Custom {
        tag: "boom",
        payload: vec![],
    });
    daemon.load_rom(vec![0x60, 0x42]);
    daemon.step();
    assert!(wait_for(&daemon, |d| d.cycle() == 1));
    assert_eq!(0x42, daemon.v()[0]);
    assert!(reader
        .drain()
        .any(|entry| entry.level == log::Level::Error && entry.message.contains("panicked")));
    // and it still panics the next time, without taking anything down
    daemon.send(Command::Custom {
        tag: "boom",
        payload: vec![],
    });
    daemon.step();
    assert!(wait_for(&daemon, |d| d.cycle() == 2));
}

#[test]
fn registering_does_not_wait_for_running_handlers() {
    let (daemon, _reader) = fast();
    let started = Arc::new(AtomicBool::new(false));
    let order = Arc::new(Mutex::new(vec![]));
    {
        let started = Arc::clone(&started);
        let order = Arc::clone(&order);
        daemon.register_handler(CommandKind::Custom("slow"), move |_, _| {
            started.store(true, Ordering::SeqCst);
            sleep(Duration::from_millis(300));
            order.lock().unwrap().push("slow");
        });
    }
    daemon.send(Command::Custom {
        tag: "slow",
        payload: vec![],
    });
    assert!(wait_for(&daemon, |_| started.load(Ordering::SeqCst)));
    let before = Instant::now();
    {
        let order = Arc::clone(&order);
        daemon.register_handler(CommandKind::Custom("slow"), move |_, _| {
            order.lock().unwrap().push("late");
        });
    }
    assert!(before.elapsed() < Duration::from_millis(150));
    assert!(wait_for(&daemon, |_| order.lock().unwrap().len() == 1));
    // the late handler joins the others, after them
    daemon.send(Command::Custom {
        tag: "slow",
        payload: vec![],
    });
    assert!(wait_for(&daemon, |_| order.lock().unwrap().len() == 3));
    assert_eq!(["slow", "slow", "late"], order.lock().unwrap()[..]);
}

#[test]
fn runs_on_a_small_stack() {
    let worker = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let (daemon, _reader) = fast();
            daemon.load_rom(vec![0x61, 0x07]);
            daemon.step();
            let ran = wait_for(&daemon, |d| d.v()[1] == 7);
            daemon.shutdown();
            ran
        })
        .unwrap();
    assert!(worker.join().unwrap());
}
