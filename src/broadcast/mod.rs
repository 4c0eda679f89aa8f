/// 방 구독 브로드캐스터
/// 방마다 현재 지켜보고 있는 관찰자 연결을 추적하고,
/// 수락된 입찰을 수락 순서 그대로 관찰자 전원에게 전달한다.
/// 프로세스당 하나를 만들어 상태로 전달한다. 전역 가변 상태가 아니다.
// region:    --- Imports
use crate::bidding::model::BidBroadcast;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Observer

/// 관찰자 연결당 수신 버퍼 크기
/// 버퍼를 비우지 못하는 관찰자는 전체 전파를 막는 대신 연결이 해제된다.
pub const OBSERVER_BUFFER: usize = 32;

/// 관찰자 연결 상태
/// connecting → subscribed → disconnected 단방향.
/// 재접속 상태는 없다. 끊긴 연결이 다시 오면 새 등록으로 취급한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Connecting,
    Subscribed,
    Disconnected,
}

struct Observer {
    state: ObserverState,
    tx: mpsc::Sender<BidBroadcast>,
}

impl Observer {
    fn new(tx: mpsc::Sender<BidBroadcast>) -> Self {
        Self {
            state: ObserverState::Connecting,
            tx,
        }
    }

    fn mark_subscribed(&mut self) {
        self.state = ObserverState::Subscribed;
    }

    fn mark_disconnected(&mut self) {
        self.state = ObserverState::Disconnected;
    }

    fn is_subscribed(&self) -> bool {
        self.state == ObserverState::Subscribed
    }
}

// endregion: --- Observer

// region:    --- Room Broadcaster

pub struct RoomBroadcaster {
    /// room_id → (observer_id → 관찰자)
    /// publish가 원장 커밋 경로에서 이 맵을 순회하므로 잠금으로 보호한다
    rooms: Mutex<HashMap<i64, HashMap<u64, Observer>>>,
    next_observer_id: AtomicU64,
}

impl Default for RoomBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_observer_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, HashMap<u64, Observer>>> {
        self.rooms.lock().expect("observer registry lock poisoned")
    }

    /// 방 관찰자 등록
    /// 등록이 끝나는 순간부터 그 방의 입찰 수락 이벤트를 받는다.
    /// 과거 입찰은 재전송하지 않는다. 늦게 합류하면 그 이전 입찰은 보이지 않는다.
    pub fn subscribe(&self, room_id: i64) -> (u64, mpsc::Receiver<BidBroadcast>) {
        let (tx, rx) = mpsc::channel(OBSERVER_BUFFER);
        let observer_id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);

        let mut observer = Observer::new(tx);
        observer.mark_subscribed();

        let mut rooms = self.lock();
        rooms.entry(room_id).or_default().insert(observer_id, observer);
        info!(
            "{:<12} --> 관찰자 등록: room_id={}, observer_id={}",
            "Broadcast", room_id, observer_id
        );
        (observer_id, rx)
    }

    /// 관찰자 등록 해제
    /// 이미 해제된 관찰자에 대해 다시 호출해도 안전하다.
    pub fn unsubscribe(&self, room_id: i64, observer_id: u64) {
        let mut rooms = self.lock();
        if let Some(observers) = rooms.get_mut(&room_id) {
            if let Some(observer) = observers.get_mut(&observer_id) {
                observer.mark_disconnected();
                info!(
                    "{:<12} --> 관찰자 해제: room_id={}, observer_id={}",
                    "Broadcast", room_id, observer_id
                );
            }
            observers.remove(&observer_id);
            if observers.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// 수락된 입찰을 방 관찰자 전원에게 전달
    /// 원장 커밋 경로에서 수락 순서대로 호출되며, 관찰자별 전달은 try_send라
    /// 느린 관찰자가 나머지 전달이나 호출자를 막을 수 없다.
    /// 전달에 실패한 관찰자는 로그를 남기고 등록에서 제거한다.
    /// 전달된 관찰자 수를 반환한다.
    pub fn publish(&self, room_id: i64, bid: &BidBroadcast) -> usize {
        let mut rooms = self.lock();
        let observers = match rooms.get_mut(&room_id) {
            Some(observers) => observers,
            None => return 0,
        };

        let mut delivered = 0;
        for (observer_id, observer) in observers.iter_mut() {
            if !observer.is_subscribed() {
                continue;
            }
            match observer.tx.try_send(bid.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "{:<12} --> 수신 버퍼 초과로 관찰자 해제: room_id={}, observer_id={}",
                        "Broadcast", room_id, observer_id
                    );
                    observer.mark_disconnected();
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    info!(
                        "{:<12} --> 연결 끊김 감지로 관찰자 해제: room_id={}, observer_id={}",
                        "Broadcast", room_id, observer_id
                    );
                    observer.mark_disconnected();
                }
            }
        }

        observers.retain(|_, observer| observer.is_subscribed());
        if observers.is_empty() {
            rooms.remove(&room_id);
        }
        delivered
    }

    /// 방의 현재 관찰자 수
    pub fn observer_count(&self, room_id: i64) -> usize {
        self.lock().get(&room_id).map_or(0, HashMap::len)
    }
}

// endregion: --- Room Broadcaster

// region:    --- Observer Guard

/// 스트림 핸들러가 보유하는 구독 가드
/// 드롭되는 시점(클라이언트 연결 종료)에 관찰자를 등록 해제한다.
pub struct ObserverGuard {
    broadcaster: Arc<RoomBroadcaster>,
    room_id: i64,
    observer_id: u64,
}

impl ObserverGuard {
    pub fn new(broadcaster: Arc<RoomBroadcaster>, room_id: i64, observer_id: u64) -> Self {
        Self {
            broadcaster,
            room_id,
            observer_id,
        }
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.room_id, self.observer_id);
    }
}

// endregion: --- Observer Guard
