//! MQTT pub/sub backend.
//!
//! rust-mqtt's client borrows its socket and buffers, so it lives inside
//! [`session_task`], which owns one broker connection at a time. The
//! [`MqttBackend`] handed to the connection controller drives that task
//! through a request channel and waits on a reply channel for every
//! command that can fail.
//!
//! Only `client` mode with a `tcp/` locator maps onto a broker connection;
//! peer mode, `udp/` locators and scouting are refused at `open`.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};
use heapless::{String, Vec};
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion::MQTTv5};
use rust_mqtt::client::raw_client::{Event, RawMqttClient};
use rust_mqtt::packet::v5::publish_packet::QualityOfService::QoS0;
use rust_mqtt::utils::rng_generator::CountingRng;

use m5pager::backend::{Backend, Encoding, Publisher, SampleHandler, Session};
use m5pager::config::{
    SessionConfig, SessionMode, CLIENT_ID, PAYLOAD_MAX_LEN, SESSION_KEEP_ALIVE_SECS,
};
use m5pager::link_watch::{Due, Inbound, LinkWatch, Verdict};
use m5pager::locator::{Locator, Protocol};

const HOST_MAX_LEN: usize = 64;
const CLIENT_ID_MAX_LEN: usize = 32;
const TOPIC_MAX_LEN: usize = 64;
const SOCKET_BUFFER_LEN: usize = 2048;
const MQTT_BUFFER_LEN: usize = 1024;
const SOCKET_TIMEOUT_SECS: u64 = 30;
const MAX_PROPERTIES: usize = 5;
/// How often the session loop looks for inbound packets.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long a SUBACK or PINGRESP may take before the link counts as dead.
const ANSWER_TIMEOUT_MS: u64 = SOCKET_TIMEOUT_SECS * 1000;

type Client<'a> = RawMqttClient<'a, TcpSocket<'a>, MAX_PROPERTIES, CountingRng>;

/// Why a backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum MqttError {
    /// Session mode is `peer`; only `client` talks to a broker.
    PeerMode,
    /// No locator configured; broker discovery is not available.
    Scouting,
    /// Locator is not `tcp/`.
    UnsupportedProtocol,
    /// Host, topic or payload does not fit its buffer.
    TooLong,
    Dns,
    Tcp,
    /// The broker refused or the session broke mid-command.
    Broker,
    /// No broker connection is open.
    NotConnected,
}

enum Request {
    Open {
        host: String<HOST_MAX_LEN>,
        port: u16,
        client_id: String<CLIENT_ID_MAX_LEN>,
    },
    Start,
    Subscribe {
        topic: String<TOPIC_MAX_LEN>,
        handler: &'static dyn SampleHandler,
    },
    Publish {
        topic: String<TOPIC_MAX_LEN>,
        payload: Vec<u8, PAYLOAD_MAX_LEN>,
    },
    Close,
}

static REQUESTS: Channel<CriticalSectionRawMutex, Request, 2> = Channel::new();
static REPLIES: Channel<CriticalSectionRawMutex, Result<(), MqttError>, 1> = Channel::new();
static LINK_UP: AtomicBool = AtomicBool::new(false);

async fn call(request: Request) -> Result<(), MqttError> {
    REQUESTS.send(request).await;
    REPLIES.receive().await
}

fn bounded<const N: usize>(s: &str) -> Result<String<N>, MqttError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| MqttError::TooLong)?;
    Ok(out)
}

fn broker_locator<'a>(config: &SessionConfig<'a>) -> Result<Locator<'a>, MqttError> {
    if config.mode != SessionMode::Client {
        warn!("MQTT needs client mode, got {=str}", config.mode.as_str());
        return Err(MqttError::PeerMode);
    }
    let Some(locator) = config.connect else {
        warn!("no broker locator configured, scouting is not supported");
        return Err(MqttError::Scouting);
    };
    if locator.protocol != Protocol::Tcp {
        warn!("MQTT runs over tcp, got {=str}", locator.protocol.as_str());
        return Err(MqttError::UnsupportedProtocol);
    }
    Ok(locator)
}

/// [`Backend`] over the MQTT session task.
pub struct MqttBackend;

impl MqttBackend {
    /// `session_task` must be running.
    pub const fn new() -> Self {
        Self
    }
}

impl Backend for MqttBackend {
    type Error = MqttError;
    type Session = MqttSession;

    async fn open(&mut self, config: &SessionConfig<'_>) -> Result<MqttSession, MqttError> {
        let locator = broker_locator(config)?;
        let client_id = locator.metadata_value("clientid").unwrap_or(CLIENT_ID);
        info!(
            "MQTT broker {=str}:{=u16} as {=str}",
            locator.host, locator.port, client_id
        );
        call(Request::Open {
            host: bounded(locator.host)?,
            port: locator.port,
            client_id: bounded(client_id)?,
        })
        .await?;
        Ok(MqttSession { _private: () })
    }
}

/// Open broker connection. Dropping it disconnects.
pub struct MqttSession {
    _private: (),
}

impl Session for MqttSession {
    type Error = MqttError;
    type Publisher = MqttPublisher;
    type Subscriber = MqttSubscriber;

    fn start_background_tasks(&mut self) {
        if REQUESTS.try_send(Request::Start).is_err() {
            warn!("MQTT request queue full, receive loop not started");
        }
    }

    async fn declare_publisher(&mut self, topic: &str) -> Result<MqttPublisher, MqttError> {
        // MQTT publishes per message; there is nothing to declare on the broker.
        Ok(MqttPublisher {
            topic: bounded(topic)?,
        })
    }

    async fn declare_subscriber(
        &mut self,
        topic: &str,
        handler: &'static dyn SampleHandler,
    ) -> Result<MqttSubscriber, MqttError> {
        call(Request::Subscribe {
            topic: bounded(topic)?,
            handler,
        })
        .await?;
        Ok(MqttSubscriber { _private: () })
    }

    fn is_alive(&self) -> bool {
        LINK_UP.load(Ordering::Acquire)
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        // A lost Close is harmless: the next Open replaces the connection.
        let _ = REQUESTS.try_send(Request::Close);
    }
}

pub struct MqttPublisher {
    topic: String<TOPIC_MAX_LEN>,
}

impl Publisher for MqttPublisher {
    type Error = MqttError;

    async fn put(&mut self, payload: &[u8], encoding: Encoding) -> Result<(), MqttError> {
        debug!("put {=usize} bytes as {=str}", payload.len(), encoding.as_str());
        call(Request::Publish {
            topic: self.topic.clone(),
            payload: Vec::from_slice(payload).map_err(|_| MqttError::TooLong)?,
        })
        .await
    }
}

/// Subscription marker; lives and dies with the session.
pub struct MqttSubscriber {
    _private: (),
}

/// Owns the broker connection and serves [`MqttBackend`] requests.
#[embassy_executor::task]
pub async fn session_task(stack: Stack<'static>) -> ! {
    let mut rx_buffer = [0u8; SOCKET_BUFFER_LEN];
    let mut tx_buffer = [0u8; SOCKET_BUFFER_LEN];
    let mut write_buf = [0u8; MQTT_BUFFER_LEN];
    let mut read_buf = [0u8; MQTT_BUFFER_LEN];
    let mut pending: Option<Request> = None;

    loop {
        let request = match pending.take() {
            Some(request) => request,
            None => REQUESTS.receive().await,
        };
        let (host, port, client_id) = match request {
            Request::Open {
                host,
                port,
                client_id,
            } => (host, port, client_id),
            other => {
                refuse(other).await;
                continue;
            }
        };

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));
        if let Err(err) = connect_socket(stack, &mut socket, &host, port).await {
            REPLIES.send(Err(err)).await;
            continue;
        }

        let mut config =
            ClientConfig::<MAX_PROPERTIES, CountingRng>::new(MQTTv5, CountingRng(20000));
        config.add_client_id(&client_id);
        config.keep_alive = SESSION_KEEP_ALIVE_SECS;
        config.max_packet_size = MQTT_BUFFER_LEN as u32;

        let mut client = RawMqttClient::<_, MAX_PROPERTIES, _>::new(
            socket,
            &mut write_buf,
            MQTT_BUFFER_LEN,
            &mut read_buf,
            MQTT_BUFFER_LEN,
            config,
        );
        if let Err(err) = handshake(&mut client).await {
            REPLIES.send(Err(err)).await;
            continue;
        }

        info!("MQTT connected");
        LINK_UP.store(true, Ordering::Release);
        REPLIES.send(Ok(())).await;

        pending = serve(&mut client).await;
        LINK_UP.store(false, Ordering::Release);
        info!("MQTT connection closed");
    }
}

async fn connect_socket(
    stack: Stack<'static>,
    socket: &mut TcpSocket<'_>,
    host: &str,
    port: u16,
) -> Result<(), MqttError> {
    let address = match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addresses) => match addresses.first() {
            Some(address) => *address,
            None => return Err(MqttError::Dns),
        },
        Err(e) => {
            warn!("DNS lookup of {=str} failed: {}", host, e);
            return Err(MqttError::Dns);
        }
    };
    socket.connect((address, port)).await.map_err(|e| {
        warn!("TCP connect failed: {}", e);
        MqttError::Tcp
    })
}

/// CONNECT, then wait for the CONNACK.
async fn handshake(client: &mut Client<'_>) -> Result<(), MqttError> {
    if let Err(code) = client.connect_to_broker().await {
        warn!("MQTT connect failed: {}", Debug2Format(&code));
        return Err(MqttError::Broker);
    }
    match client.poll::<1>().await {
        Ok(Event::Connack) => Ok(()),
        Ok(_) => {
            warn!("MQTT broker did not answer with CONNACK");
            Err(MqttError::Broker)
        }
        Err(code) => {
            warn!("MQTT connect refused: {}", Debug2Format(&code));
            Err(MqttError::Broker)
        }
    }
}

/// Answer a request that arrived with no connection open.
async fn refuse(request: Request) {
    match request {
        Request::Subscribe { .. } | Request::Publish { .. } => {
            REPLIES.send(Err(MqttError::NotConnected)).await
        }
        Request::Open { .. } | Request::Start | Request::Close => {}
    }
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

fn inbound(event: Event<'_>) -> Inbound<'_> {
    match event {
        Event::Message(topic, payload) => Inbound::Message { topic, payload },
        Event::Pingresp => Inbound::PingResponse,
        Event::Suback(id) => Inbound::SubscribeAck(id),
        Event::Disconnect(code) => {
            warn!("MQTT broker disconnected: {}", Debug2Format(&code));
            Inbound::Disconnect
        }
        _ => Inbound::Other,
    }
}

/// Serve one connection until it closes or breaks.
///
/// Every inbound packet goes through the single `poll_if_ready` below, so
/// acknowledgements never swallow a PUBLISH. PINGREQ and SUBSCRIBE are
/// fire-and-forget here; [`LinkWatch`] matches their answers.
///
/// Returns an `Open` that arrived while connected, to be handled next.
async fn serve(client: &mut Client<'_>) -> Option<Request> {
    let ping_period = u64::from(SESSION_KEEP_ALIVE_SECS / 2).max(1) * 1000;
    let mut watch = LinkWatch::new(ping_period, ANSWER_TIMEOUT_MS, now_ms());
    let mut subscription: Option<(String<TOPIC_MAX_LEN>, &'static dyn SampleHandler)> = None;
    let mut running = false;

    let reopen = 'session: loop {
        let request = if running {
            match select(REQUESTS.receive(), Timer::after(POLL_INTERVAL)).await {
                Either::First(request) => Some(request),
                Either::Second(()) => None,
            }
        } else {
            Some(REQUESTS.receive().await)
        };

        match request {
            None => {}
            Some(Request::Start) => running = true,
            Some(Request::Close) => break 'session None,
            Some(reopen @ Request::Open { .. }) => break 'session Some(reopen),
            Some(Request::Subscribe { topic, handler }) => {
                let mut filters: Vec<&str, 1> = Vec::new();
                let _ = filters.push(topic.as_str());
                match client.subscribe_to_topics(&filters).await {
                    Ok(id) => {
                        watch.subscribe_sent(id, now_ms());
                        subscription = Some((topic, handler));
                    }
                    Err(code) => {
                        warn!("MQTT subscribe failed: {}", Debug2Format(&code));
                        REPLIES.send(Err(MqttError::Broker)).await;
                        break 'session None;
                    }
                }
            }
            Some(Request::Publish { topic, payload }) => {
                match client.send_message(&topic, &payload, QoS0, false).await {
                    Ok(_) => {
                        watch.sent(now_ms());
                        REPLIES.send(Ok(())).await;
                    }
                    Err(code) => {
                        warn!("MQTT publish failed: {}", Debug2Format(&code));
                        REPLIES.send(Err(MqttError::Broker)).await;
                        break 'session None;
                    }
                }
            }
        }

        if !running {
            continue;
        }

        loop {
            let packet = match client.poll_if_ready::<1>().await {
                Ok(Some(event)) => inbound(event),
                Ok(None) => break,
                Err(code) => {
                    warn!("MQTT receive failed: {}", Debug2Format(&code));
                    break 'session None;
                }
            };
            match watch.on_inbound(packet) {
                Verdict::Deliver { topic, payload } => match &subscription {
                    Some((filter, handler)) if filter.as_str() == topic => {
                        handler.on_sample(topic, payload)
                    }
                    _ => debug!("ignoring message on {=str}", topic),
                },
                Verdict::Acked => REPLIES.send(Ok(())).await,
                Verdict::Idle => {}
                Verdict::Lost => break 'session None,
            }
        }

        match watch.due(now_ms()) {
            Due::Nothing => {}
            Due::Ping => {
                if let Err(code) = client.send_ping().await {
                    warn!("MQTT ping failed: {}", Debug2Format(&code));
                    break 'session None;
                }
                watch.ping_sent(now_ms());
            }
            Due::Lost => {
                warn!("MQTT broker stopped answering");
                break 'session None;
            }
        }
    };

    if watch.awaiting_ack() {
        REPLIES.send(Err(MqttError::Broker)).await;
    }
    let _ = client.disconnect().await;
    reopen
}
