//! Integration tests for lbs-central host-testable logic.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::Vec;
use lbs_central::ble::client::ClientState;
use lbs_central::ble::discovery::{DiscoveredChar, DiscoveryEngine, DiscoveryOutcome};
use lbs_central::ble::{
    AttHandle, ConnHandle, DeviceIdentity, GattClient, GattStatus, HvxKind, SecurityManager,
    SecurityStatus, TimeoutSource, TransportEvent, Uuid, WriteOp,
};
use lbs_central::config::{LBS_PEER_BUTTON_CHAR_UUID, LBS_PEER_LED_CHAR_UUID};
use lbs_central::error::{DiscoveryError, GattError, SecurityError};
use lbs_central::indicator::{IndicatorBank, LedSink};
use lbs_central::{Central, Error};

const BASE: u8 = 3;
const CCCD: AttHandle = AttHandle(0x10);
const DATA: AttHandle = AttHandle(0x12);
const LED: AttHandle = AttHandle(0x14);

#[derive(Default)]
struct Radio {
    writes: Vec<(ConnHandle, WriteOp, AttHandle), 64>,
}

impl GattClient for Radio {
    fn write(
        &mut self,
        conn: ConnHandle,
        op: WriteOp,
        handle: AttHandle,
        _value: &[u8],
    ) -> Result<(), GattError> {
        // Keep the most recent writes only; long runs overflow the buffer.
        if self.writes.is_full() {
            self.writes.remove(0);
        }
        let _ = self.writes.push((conn, op, handle));
        Ok(())
    }
}

#[derive(Default)]
struct Walker;

impl DiscoveryEngine for Walker {
    fn register(&mut self, _service: Uuid) -> Result<(), DiscoveryError> {
        Ok(())
    }

    fn start(&mut self, _conn: ConnHandle) -> Result<(), DiscoveryError> {
        Ok(())
    }

    fn on_transport_event(&mut self, _event: &TransportEvent) {}
}

#[derive(Default)]
struct Bonding {
    requests: u32,
}

impl SecurityManager for Bonding {
    fn request_upgrade(&mut self, _identity: DeviceIdentity) -> Result<(), SecurityError> {
        self.requests += 1;
        Ok(())
    }
}

#[derive(Default)]
struct Pin {
    high: Option<bool>,
}

impl ErrorType for Pin {
    type Error = Infallible;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = Some(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = Some(true);
        Ok(())
    }
}

type Board = Central<Radio, Walker, Bonding, LedSink<Pin>, IndicatorBank<Pin, 2>, 4>;

fn board() -> Board {
    Central::init(
        Radio::default(),
        Walker,
        Bonding::default(),
        LedSink::new(Pin::default(), Pin::default()),
        IndicatorBank::new([Pin::default(), Pin::default()]),
        BASE,
    )
    .unwrap()
}

fn lbs(conn: ConnHandle) -> DiscoveryOutcome {
    let mut chars = Vec::new();
    chars
        .push(DiscoveredChar {
            uuid: Uuid::Vendor {
                base: BASE,
                uuid: LBS_PEER_BUTTON_CHAR_UUID,
            },
            value_handle: DATA,
            cccd_handle: Some(CCCD),
        })
        .unwrap();
    chars
        .push(DiscoveredChar {
            uuid: Uuid::Vendor {
                base: BASE,
                uuid: LBS_PEER_LED_CHAR_UUID,
            },
            value_handle: LED,
            cccd_handle: None,
        })
        .unwrap();
    DiscoveryOutcome::complete(conn, chars)
}

fn cccd_writes(board: &Board, conn: ConnHandle) -> usize {
    board
        .gatt()
        .writes
        .iter()
        .filter(|w| **w == (conn, WriteOp::Request, CCCD))
        .count()
}

#[test]
fn button_press_reaches_sink() {
    let a = DeviceIdentity::new(0, 1);
    let conn = ConnHandle(7);
    let mut board = board();

    board.create(a, conn).unwrap();
    board.on_discovery_complete(&lbs(conn));
    assert_eq!(board.state(0), ClientState::EnablingNotifications);
    assert_eq!(cccd_writes(&board, conn), 1);

    board.dispatch(&TransportEvent::write_response(conn, CCCD, GattStatus::Success));
    assert_eq!(board.state(0), ClientState::Running);

    board.dispatch(&TransportEvent::notification(conn, DATA, HvxKind::Notification, &[1]));
    board.dispatch(&TransportEvent::notification(conn, DATA, HvxKind::Notification, &[0, 1]));

    // Notification LED is lit (active low) and was not cleared by the
    // two-byte payload; the indication LED was never touched.
    let (notification, indication) = board.sink().pins();
    assert_eq!(notification.high, Some(false));
    assert_eq!(indication.high, None);

    board.write_data(conn, 1).unwrap();
    assert_eq!(
        board.gatt().writes.last(),
        Some(&(conn, WriteOp::Command, LED))
    );
}

#[test]
fn bonding_resumes_notification_setup() {
    let a = DeviceIdentity::new(1, 9);
    let conn = ConnHandle(7);
    let mut board = board();

    board.create(a, conn).unwrap();
    board.on_discovery_complete(&lbs(conn));
    board.dispatch(&TransportEvent::write_response(
        conn,
        CCCD,
        GattStatus::from(0x0105),
    ));
    assert_eq!(board.security().requests, 1);
    assert_eq!(board.state(1), ClientState::EnablingNotifications);

    board.dispatch(&TransportEvent::security_changed(conn, SecurityStatus::Secured));
    assert_eq!(cccd_writes(&board, conn), 2);
    assert_eq!(board.state(1), ClientState::EnablingNotifications);

    board.dispatch(&TransportEvent::write_response(conn, CCCD, GattStatus::Success));
    assert_eq!(board.state(1), ClientState::Running);
}

#[test]
fn error_slot_needs_destroy_and_create() {
    let a = DeviceIdentity::new(0, 1);
    let conn = ConnHandle(3);
    let mut board = board();

    board.create(a, conn).unwrap();
    board.dispatch(&TransportEvent::timeout(conn, TimeoutSource::Protocol));
    assert_eq!(board.state(0), ClientState::Error);
    assert_eq!(board.create(a, ConnHandle(4)), Err(Error::AlreadyAtCapacity));

    board.destroy(a).unwrap();
    assert_eq!(board.indicators().pins()[0].high, Some(true));
    assert_eq!(board.create(a, ConnHandle(4)), Ok(0));
    assert_eq!(board.state(0), ClientState::DiscoveringServices);
}

#[test]
fn full_table_rejects_create_unchanged() {
    let mut board = board();
    for slot in 0..4u8 {
        board
            .create(DeviceIdentity::new(slot, slot.into()), ConnHandle(10 + u16::from(slot)))
            .unwrap();
    }
    assert_eq!(board.count(), 4);

    assert_eq!(
        board.create(DeviceIdentity::new(4, 4), ConnHandle(20)),
        Err(Error::AlreadyAtCapacity)
    );
    assert_eq!(board.count(), 4);
    assert_eq!(board.slot_for_connection(ConnHandle(20)), None);
    for slot in 0..4 {
        assert_eq!(board.state(slot), ClientState::DiscoveringServices);
    }
}

/// Small deterministic generator so the walk is reproducible.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self, bound: u32) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 16) % bound
    }
}

#[test]
fn random_event_walk_keeps_connections_unique() {
    let mut board = board();
    let mut rng = Lcg(0x5EED);

    for _ in 0..2_000 {
        let slot = rng.next(5) as u8;
        let identity = DeviceIdentity::new(slot, u16::from(slot));
        let conn = ConnHandle(rng.next(6) as u16);
        let count_before = board.count();

        match rng.next(8) {
            0 => match board.create(identity, conn) {
                Ok(_) => assert_eq!(board.count(), count_before + 1),
                Err(_) => assert_eq!(board.count(), count_before),
            },
            1 => match board.destroy(identity) {
                Ok(()) => assert_eq!(board.count(), count_before - 1),
                Err(e) => {
                    assert_eq!(e, Error::NotConnected);
                    assert_eq!(board.count(), count_before);
                }
            },
            2 => board.on_discovery_complete(&lbs(conn)),
            3 => board.dispatch(&TransportEvent::write_response(
                conn,
                if rng.next(2) == 0 { CCCD } else { DATA },
                GattStatus::Success,
            )),
            4 => board.dispatch(&TransportEvent::notification(
                conn,
                DATA,
                HvxKind::Notification,
                &[rng.next(2) as u8],
            )),
            5 => board.dispatch(&TransportEvent::security_changed(conn, SecurityStatus::Secured)),
            6 => board.dispatch(&TransportEvent::timeout(conn, TimeoutSource::Protocol)),
            _ => board.dispatch(&TransportEvent::disconnected(conn)),
        }

        for c in 0..6u16 {
            let holders = board
                .table()
                .iter()
                .filter(|(_, slot)| slot.connection() == Some(ConnHandle(c)))
                .count();
            assert!(holders <= 1, "conn {} held by {} slots", c, holders);
        }
        let live = board.table().iter().filter(|(_, slot)| !slot.is_idle()).count();
        assert_eq!(live, usize::from(board.count()));
    }
}
