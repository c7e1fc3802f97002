//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! [`World`] over a line-delimited JSON connection to a world-client sidecar

use super::{World, WorldError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use triad_common::{
    BlockPos, BridgeMessage, BridgeReply, BridgeRequest, EntityId, EntityInfo, EquipSlot,
    InventoryItem, PlayerInfo, Vec3, WorldCall, WorldEvent,
};

const MAX_FRAME_LENGTH: usize = 1 << 20;
const EVENT_BUFFER: usize = 256;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>>;

/// Connection to one world-client session.
///
/// Requests are correlated with replies by id. Lifecycle events are pushed
/// to the receiver returned by [`BridgeWorld::connect`]; when the connection
/// ends every pending request fails with [`WorldError::Closed`] and a final
/// [`WorldEvent::Disconnect`] is delivered.
pub struct BridgeWorld {
    writer: tokio::sync::Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    request_timeout: Duration,
    reader: JoinHandle<()>,
}

impl BridgeWorld {
    /// Connect to the sidecar at `addr`
    pub async fn connect(
        addr: &str,
        request_timeout: Duration,
    ) -> Result<(Self, mpsc::Receiver<WorldEvent>), WorldError> {
        tracing::info!("Connecting to world bridge at {}", addr);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| WorldError::Transport(format!("Failed to connect to {}: {}", addr, e)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| WorldError::Transport(e.to_string()))?;
        Ok(Self::from_stream(stream, request_timeout))
    }

    pub fn from_stream(
        stream: TcpStream,
        request_timeout: Duration,
    ) -> (Self, mpsc::Receiver<WorldEvent>) {
        let (read_half, write_half) = stream.into_split();
        let reader = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        let writer = FramedWrite::new(write_half, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        let reader = tokio::spawn(read_loop(reader, pending.clone(), closed.clone(), events_tx));

        let world = Self {
            writer: tokio::sync::Mutex::new(writer),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            request_timeout,
            reader,
        };
        (world, events_rx)
    }

    /// Log in as `username`. The sidecar raises `Spawn` once in the world.
    pub async fn join(&self, username: &str) -> Result<(), WorldError> {
        self.call(WorldCall::Join {
            username: username.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn call(&self, call: WorldCall) -> Result<serde_json::Value, WorldError> {
        if self.is_closed() {
            return Err(WorldError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let op = call.op();
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id, tx);
        // The reader may have shut down between the check above and the insert
        if self.is_closed() {
            self.lock_pending().remove(&id);
            return Err(WorldError::Closed);
        }

        let frame = serde_json::to_string(&BridgeRequest { id, call })
            .map_err(|e| WorldError::Decode(e.to_string()))?;
        tracing::trace!("-> {}", frame);
        if let Err(e) = self.writer.lock().await.send(frame).await {
            self.lock_pending().remove(&id);
            return Err(WorldError::Transport(format!("Failed to send {}: {}", op, e)));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Err(_) => {
                self.lock_pending().remove(&id);
                Err(WorldError::Timeout(op.to_string()))
            }
            Ok(Err(_)) => Err(WorldError::Closed),
            Ok(Ok(reply)) => match reply.error {
                Some(error) => Err(WorldError::Rejected(error)),
                None => Ok(reply.value),
            },
        }
    }

    async fn call_as<T: DeserializeOwned>(&self, call: WorldCall) -> Result<T, WorldError> {
        let op = call.op();
        let value = self.call(call).await?;
        serde_json::from_value(value)
            .map_err(|e| WorldError::Decode(format!("Bad reply to {}: {}", op, e)))
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<BridgeReply>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for BridgeWorld {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut reader: FramedRead<OwnedReadHalf, LinesCodec>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    events: mpsc::Sender<WorldEvent>,
) {
    let reason = loop {
        let line = match reader.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => break format!("Read error: {}", e),
            None => break "Connection closed by world client".to_string(),
        };
        tracing::trace!("<- {}", line);
        match serde_json::from_str::<BridgeMessage>(&line) {
            Ok(BridgeMessage::Reply(reply)) => {
                let sender = pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&reply.id);
                match sender {
                    Some(sender) => {
                        let _ = sender.send(reply);
                    }
                    None => tracing::debug!("Dropping reply for unknown request {}", reply.id),
                }
            }
            Ok(BridgeMessage::Event { event }) => {
                if events.send(event).await.is_err() {
                    tracing::debug!("Event receiver dropped");
                }
            }
            Err(e) => tracing::warn!("Ignoring malformed bridge frame: {}", e),
        }
    };

    tracing::info!("World bridge disconnected: {}", reason);
    closed.store(true, Ordering::SeqCst);
    // Dropping the senders fails every waiting caller with `Closed`
    pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
    let _ = events.send(WorldEvent::Disconnect { reason }).await;
}

/// Wait for the first `Spawn`, discarding anything raised before it
pub async fn wait_for_spawn(
    events: &mut mpsc::Receiver<WorldEvent>,
    timeout: Duration,
) -> Result<(), WorldError> {
    let wait = async {
        while let Some(event) = events.recv().await {
            match event {
                WorldEvent::Spawn => return Ok(()),
                WorldEvent::Disconnect { reason } => {
                    return Err(WorldError::Transport(format!(
                        "Disconnected before spawn: {}",
                        reason
                    )));
                }
                other => tracing::debug!("Ignoring {} before spawn", other.name()),
            }
        }
        Err(WorldError::Closed)
    };
    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| WorldError::Timeout("spawn".to_string()))?
}

#[async_trait]
impl World for BridgeWorld {
    async fn own_entity(&self) -> Result<EntityInfo, WorldError> {
        self.call_as(WorldCall::OwnEntity).await
    }

    async fn time_of_day(&self) -> Result<u32, WorldError> {
        self.call_as(WorldCall::TimeOfDay).await
    }

    async fn health(&self) -> Result<f32, WorldError> {
        self.call_as(WorldCall::Health).await
    }

    async fn entity(&self, id: EntityId) -> Result<Option<EntityInfo>, WorldError> {
        self.call_as(WorldCall::Entity { id }).await
    }

    async fn entities(&self) -> Result<Vec<EntityInfo>, WorldError> {
        self.call_as(WorldCall::Entities).await
    }

    async fn players(&self) -> Result<Vec<PlayerInfo>, WorldError> {
        self.call_as(WorldCall::Players).await
    }

    async fn inventory(&self) -> Result<Vec<InventoryItem>, WorldError> {
        self.call_as(WorldCall::Inventory).await
    }

    async fn is_known_block(&self, kind: &str) -> Result<bool, WorldError> {
        self.call_as(WorldCall::IsKnownBlock {
            kind: kind.to_string(),
        })
        .await
    }

    async fn find_blocks(
        &self,
        kind: &str,
        max_distance: f64,
        count: usize,
    ) -> Result<Vec<BlockPos>, WorldError> {
        self.call_as(WorldCall::FindBlocks {
            kind: kind.to_string(),
            max_distance,
            count,
        })
        .await
    }

    async fn combat_target(&self) -> Result<Option<EntityId>, WorldError> {
        self.call_as(WorldCall::CombatTarget).await
    }

    async fn set_pursuit_goal(&self, target: EntityId, standoff: f64) -> Result<(), WorldError> {
        self.call(WorldCall::SetPursuitGoal { target, standoff })
            .await
            .map(|_| ())
    }

    async fn path_to(&self, point: Vec3, standoff: f64) -> Result<(), WorldError> {
        self.call(WorldCall::PathTo { point, standoff })
            .await
            .map(|_| ())
    }

    async fn clear_goal(&self) -> Result<(), WorldError> {
        self.call(WorldCall::ClearGoal).await.map(|_| ())
    }

    async fn attack(&self, target: EntityId) -> Result<(), WorldError> {
        self.call(WorldCall::Attack { target }).await.map(|_| ())
    }

    async fn stop_combat(&self) -> Result<(), WorldError> {
        self.call(WorldCall::StopCombat).await.map(|_| ())
    }

    async fn equip(&self, item: &str, slot: EquipSlot) -> Result<(), WorldError> {
        self.call(WorldCall::Equip {
            item: item.to_string(),
            slot,
        })
        .await
        .map(|_| ())
    }

    async fn consume(&self) -> Result<(), WorldError> {
        self.call(WorldCall::Consume).await.map(|_| ())
    }

    async fn collect(&self, block: BlockPos) -> Result<(), WorldError> {
        self.call(WorldCall::Collect { block }).await.map(|_| ())
    }

    async fn chat(&self, text: &str) -> Result<(), WorldError> {
        self.call(WorldCall::Chat {
            text: text.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn whisper(&self, name: &str, text: &str) -> Result<(), WorldError> {
        self.call(WorldCall::Whisper {
            name: name.to_string(),
            text: text.to_string(),
        })
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Accept one connection and hand back its buffered reader and writer
    async fn sidecar() -> (
        String,
        JoinHandle<(BufReader<OwnedReadHalf>, OwnedWriteHalf)>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, write) = stream.into_split();
            (BufReader::new(read), write)
        });
        (addr, accept)
    }

    async fn read_request(reader: &mut BufReader<OwnedReadHalf>) -> BridgeRequest {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    async fn write_frame(writer: &mut OwnedWriteHalf, message: &BridgeMessage) {
        let mut line = serde_json::to_string(message).unwrap();
        line.push('\n');
        writer.write_all(line.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_reply_correlation() {
        let (addr, accept) = sidecar().await;
        let (world, _events) = BridgeWorld::connect(&addr, Duration::from_secs(5)).await.unwrap();
        let (mut reader, mut writer) = accept.await.unwrap();

        let server = tokio::spawn(async move {
            let request = read_request(&mut reader).await;
            assert_eq!(request.call, WorldCall::Health);
            write_frame(
                &mut writer,
                &BridgeMessage::Reply(BridgeReply::ok(request.id, serde_json::json!(17.5))),
            )
            .await;

            let request = read_request(&mut reader).await;
            assert_eq!(request.call.op(), "path_to");
            write_frame(
                &mut writer,
                &BridgeMessage::Reply(BridgeReply::err(request.id, "No path")),
            )
            .await;
            (reader, writer)
        });

        assert_eq!(world.health().await.unwrap(), 17.5);
        let result = world.path_to(Vec3::new(1.0, 64.0, 1.0), 2.0).await;
        assert_eq!(result, Err(WorldError::Rejected("No path".to_string())));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_are_forwarded() {
        let (addr, accept) = sidecar().await;
        let (_world, mut events) = BridgeWorld::connect(&addr, Duration::from_secs(5)).await.unwrap();
        let (_reader, mut writer) = accept.await.unwrap();

        write_frame(
            &mut writer,
            &BridgeMessage::Event {
                event: WorldEvent::Chat {
                    from: "Alice".into(),
                    text: "hi oracle".into(),
                },
            },
        )
        .await;
        write_frame(&mut writer, &BridgeMessage::Event { event: WorldEvent::Spawn }).await;

        assert_eq!(
            events.recv().await,
            Some(WorldEvent::Chat {
                from: "Alice".into(),
                text: "hi oracle".into()
            })
        );
        assert_eq!(events.recv().await, Some(WorldEvent::Spawn));
    }

    #[tokio::test]
    async fn test_wait_for_spawn_skips_early_events() {
        let (addr, accept) = sidecar().await;
        let (_world, mut events) = BridgeWorld::connect(&addr, Duration::from_secs(5)).await.unwrap();
        let (_reader, mut writer) = accept.await.unwrap();

        write_frame(
            &mut writer,
            &BridgeMessage::Event {
                event: WorldEvent::PlayerJoined { name: "Bob".into() },
            },
        )
        .await;
        write_frame(&mut writer, &BridgeMessage::Event { event: WorldEvent::Spawn }).await;

        assert!(wait_for_spawn(&mut events, Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending_requests() {
        let (addr, accept) = sidecar().await;
        let (world, mut events) = BridgeWorld::connect(&addr, Duration::from_secs(5)).await.unwrap();
        let (mut reader, writer) = accept.await.unwrap();

        let server = tokio::spawn(async move {
            let _request = read_request(&mut reader).await;
            drop(writer);
            drop(reader);
        });

        assert_eq!(world.inventory().await, Err(WorldError::Closed));
        server.await.unwrap();
        assert!(matches!(events.recv().await, Some(WorldEvent::Disconnect { .. })));
        assert!(world.is_closed());
        assert_eq!(world.clear_goal().await, Err(WorldError::Closed));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let (addr, accept) = sidecar().await;
        let (world, _events) = BridgeWorld::connect(&addr, Duration::from_millis(50)).await.unwrap();
        let (_reader, _writer) = accept.await.unwrap();

        assert_eq!(
            world.time_of_day().await,
            Err(WorldError::Timeout("time_of_day".to_string()))
        );
    }

    #[tokio::test]
    async fn test_spawn_timeout() {
        let (_tx, mut rx) = mpsc::channel::<WorldEvent>(1);
        let result = wait_for_spawn(&mut rx, Duration::from_millis(20)).await;
        assert_eq!(result, Err(WorldError::Timeout("spawn".to_string())));
    }
}
