use crate::adapters::live_source::LiveFrameSource;
use crate::config::settings::{StreamSettings, Token};
use crate::core::frame_queue::FrameConsumer;
use crate::domain::model::{VoiceTarget, CHANNELS, SAMPLE_RATE};
use crate::domain::ports::{EventSender, StreamEvent, VoiceTransport};
use crate::utils::error::{MelodiqaError, Result};
use async_trait::async_trait;
use serenity::all::{
    ActivityData, Channel, ChannelId, ChannelType, Context, EventHandler, GatewayIntents,
    GuildId, OnlineStatus, Ready, ResumedEvent,
};
use serenity::gateway::ShardManager;
use serenity::Client;
use songbird::error::JoinError;
use songbird::input::{Input, RawAdapter};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, CoreEvent, Event, EventContext, SerenityInit, Songbird, TrackEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type ReadyPayload = (Context, Ready);

/// Hands the first `Ready` of the gateway session to `DiscordVoice::connect`.
struct GatewayHandler {
    ready_tx: Mutex<Option<oneshot::Sender<ReadyPayload>>>,
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(
            "✅ Logged in as {} ({} guild(s))",
            ready.user.name,
            ready.guilds.len()
        );
        let sender = self.ready_tx.lock().ok().and_then(|mut tx| tx.take());
        if let Some(sender) = sender {
            let _ = sender.send((ctx, ready));
        }
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        tracing::debug!("Gateway session resumed");
    }
}

/// Forwards voice driver and track events to the engine.
struct VoiceEventForwarder {
    events: EventSender,
}

#[async_trait]
impl songbird::EventHandler for VoiceEventForwarder {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverConnect(_) => {
                tracing::info!("🔊 Voice connection established");
            }
            EventContext::DriverReconnect(_) => {
                let _ = self.events.send(StreamEvent::VoiceReconnected);
            }
            EventContext::DriverDisconnect(data) => {
                let reason = data
                    .reason
                    .as_ref()
                    .map(|r| format!("{:?}", r))
                    .unwrap_or_else(|| "disconnected".to_string());
                let _ = self.events.send(StreamEvent::VoiceDisconnected(format!(
                    "{:?}: {}",
                    data.kind, reason
                )));
            }
            EventContext::Track(tracks) => {
                for (state, _handle) in tracks.iter() {
                    let event = match &state.playing {
                        PlayMode::Errored(err) => StreamEvent::PlaybackFailed(format!("{:?}", err)),
                        PlayMode::End | PlayMode::Stop => StreamEvent::PlaybackEnded,
                        _ => continue,
                    };
                    let _ = self.events.send(event);
                }
            }
            _ => {}
        }
        None
    }
}

struct GatewaySession {
    shard_manager: Arc<ShardManager>,
    client_task: JoinHandle<serenity::Result<()>>,
    manager: Option<Arc<Songbird>>,
    guild_id: Option<GuildId>,
    call: Option<Arc<tokio::sync::Mutex<Call>>>,
    track: Option<TrackHandle>,
}

/// Voice transport backed by serenity (gateway) and songbird (voice).
pub struct DiscordVoice {
    token: Token,
    ready_timeout: Duration,
    underrun_wait: Duration,
    session: Option<GatewaySession>,
}

impl DiscordVoice {
    pub fn new(settings: &StreamSettings) -> Self {
        Self {
            token: settings.token.clone(),
            ready_timeout: settings.ready_timeout,
            underrun_wait: settings.underrun_wait,
            session: None,
        }
    }

    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::GUILD_VOICE_STATES
            | GatewayIntents::MESSAGE_CONTENT
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.call.is_some())
    }
}

async fn check_voice_channel(ctx: &Context, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
    let not_found = || MelodiqaError::ChannelNotFound {
        guild_id: guild_id.get(),
        channel_id: channel_id.get(),
    };

    let channel = channel_id.to_channel(ctx).await.map_err(|e| {
        tracing::debug!("Channel lookup for {} failed: {}", channel_id, e);
        not_found()
    })?;

    match channel {
        Channel::Guild(channel)
            if channel.guild_id == guild_id
                && matches!(channel.kind, ChannelType::Voice | ChannelType::Stage) =>
        {
            tracing::info!("Target voice channel: #{}", channel.name);
            Ok(())
        }
        _ => Err(not_found()),
    }
}

#[async_trait]
impl VoiceTransport for DiscordVoice {
    async fn connect(&mut self, target: VoiceTarget, events: EventSender) -> Result<()> {
        let (ready_tx, ready_rx) = oneshot::channel::<ReadyPayload>();
        let handler = GatewayHandler {
            ready_tx: Mutex::new(Some(ready_tx)),
        };

        let mut client = Client::builder(self.token.expose(), Self::intents())
            .event_handler(handler)
            .activity(ActivityData::listening("to jams"))
            .status(OnlineStatus::DoNotDisturb)
            .register_songbird()
            .await?;

        let shard_manager = Arc::clone(&client.shard_manager);
        let mut client_task = tokio::spawn(async move { client.start().await });

        let ready = tokio::select! {
            ready = ready_rx => ready.map_err(|_| MelodiqaError::internal("gateway handler dropped before ready")),
            joined = &mut client_task => {
                return Err(match joined {
                    Ok(Err(e)) => e.into(),
                    Ok(Ok(())) => MelodiqaError::internal("gateway closed before the session was ready"),
                    Err(e) => MelodiqaError::internal(format!("gateway task failed: {}", e)),
                });
            }
            _ = tokio::time::sleep(self.ready_timeout) => Err(MelodiqaError::ReadyTimeout {
                seconds: self.ready_timeout.as_secs(),
            }),
        };

        let session = self.session.insert(GatewaySession {
            shard_manager,
            client_task,
            manager: None,
            guild_id: None,
            call: None,
            track: None,
        });
        let (ctx, ready) = ready?;

        let guild_id = GuildId::new(target.guild_id);
        if !ready.guilds.iter().any(|g| g.id == guild_id) {
            return Err(MelodiqaError::GuildNotFound {
                guild_id: target.guild_id,
            });
        }
        let channel_id = ChannelId::new(target.channel_id);
        check_voice_channel(&ctx, guild_id, channel_id).await?;

        let manager = songbird::get(&ctx)
            .await
            .ok_or_else(|| MelodiqaError::internal("songbird voice client was not registered"))?;
        session.manager = Some(Arc::clone(&manager));
        session.guild_id = Some(guild_id);

        tracing::info!("Connecting to voice channel");
        let call = manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MelodiqaError::VoiceJoinError {
                message: e.to_string(),
            })?;

        {
            let mut handler = call.lock().await;
            // 只送不收
            if let Err(e) = handler.deafen(true).await {
                tracing::debug!("Failed to self-deafen: {}", e);
            }
            for event in [
                Event::Core(CoreEvent::DriverConnect),
                Event::Core(CoreEvent::DriverReconnect),
                Event::Core(CoreEvent::DriverDisconnect),
                Event::Track(TrackEvent::End),
                Event::Track(TrackEvent::Error),
            ] {
                handler.add_global_event(
                    event,
                    VoiceEventForwarder {
                        events: events.clone(),
                    },
                );
            }
        }

        session.call = Some(call);
        Ok(())
    }

    async fn play(&mut self, consumer: FrameConsumer) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MelodiqaError::internal("play called before connect"))?;
        let call = session
            .call
            .clone()
            .ok_or_else(|| MelodiqaError::internal("play called without a voice call"))?;

        let source = LiveFrameSource::new(consumer, self.underrun_wait);
        let input: Input = RawAdapter::new(source, SAMPLE_RATE, CHANNELS as u32).into();

        let track = call.lock().await.play_input(input);
        session.track = Some(track);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        if let Some(track) = session.track.take() {
            if let Err(e) = track.stop() {
                tracing::debug!("Failed to stop track: {}", e);
            }
        }

        let mut result = Ok(());
        if let (Some(manager), Some(guild_id)) = (&session.manager, session.guild_id) {
            match manager.remove(guild_id).await {
                Ok(()) | Err(JoinError::NoCall) => {}
                Err(e) => {
                    result = Err(MelodiqaError::VoiceJoinError {
                        message: format!("failed to leave voice channel: {}", e),
                    })
                }
            }
        }

        session.shard_manager.shutdown_all().await;
        match session.client_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Gateway client stopped with error: {}", e),
            Err(e) => tracing::warn!("Gateway task failed: {}", e),
        }

        tracing::info!("👋 Disconnected from Discord");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DeviceSelector;

    fn settings() -> StreamSettings {
        StreamSettings {
            token: Token::new("token"),
            target: VoiceTarget {
                guild_id: 1,
                channel_id: 2,
            },
            device: DeviceSelector::Index(0),
            audio_host: None,
            queue_frames: 50,
            underrun_wait: Duration::from_millis(5),
            stats_interval: Duration::from_secs(60),
            monitor: false,
            ready_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_intents_cover_voice_states() {
        let intents = DiscordVoice::intents();
        assert!(intents.contains(GatewayIntents::GUILD_VOICE_STATES));
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_noop() {
        let mut voice = DiscordVoice::new(&settings());
        assert!(!voice.is_connected());
        assert!(voice.disconnect().await.is_ok());
        assert!(voice.disconnect().await.is_ok());
    }

    #[test]
    fn test_play_before_connect_fails() {
        let mut voice = DiscordVoice::new(&settings());
        let (_producer, consumer) =
            crate::core::frame_queue::frame_queue(2, Arc::new(Default::default()));
        assert!(tokio_test::block_on(voice.play(consumer)).is_err());
    }
}
