//! HTTP surface: the chat page and the websocket upgrade.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use warp::Filter;

use crate::relay::RoomRelay;
use crate::session;

static CHAT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <title>ChatWave</title>
    </head>
    <body>
        <h1 id="room-title">ChatWave</h1>
        <div id="chat">
            <p><em>Connecting...</em></p>
        </div>
        <form id="compose">
            <input type="text" id="text" autocomplete="off" />
            <button type="submit" id="send">Send</button>
        </form>
        <script type="text/javascript">
        const chat = document.getElementById('chat');
        const text = document.getElementById('text');
        // The room rides the URL path; the display name comes from the
        // authenticated page context, here the `name` query parameter.
        const room = decodeURIComponent(location.pathname.split('/')[1]);
        const username = new URLSearchParams(location.search).get('name') || 'Anonymous';
        const RECONNECT_DELAY_MS = 2000;
        let ws = null;

        document.getElementById('room-title').innerText = 'Room #' + room;

        function line(content, system) {
            const p = document.createElement('p');
            p.innerText = content;
            if (system) p.style.fontStyle = 'italic';
            chat.appendChild(p);
        }

        function emit(event, data) {
            ws.send(JSON.stringify({ event: event, data: data }));
        }

        function connect() {
            const proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
            ws = new WebSocket(proto + location.host + '/chat');

            // The join intent rides every open, so a reconnect rebinds the
            // room without needing to be told apart from the first connect.
            ws.onopen = function() {
                chat.innerHTML = '<p><em>Connected!</em></p>';
                emit('join-room', { room: room, username: username });
            };

            ws.onmessage = function(raw) {
                const evt = JSON.parse(raw.data);
                const data = evt.data;
                if (evt.event === 'rejected') {
                    line('rejected: ' + data.reason, true);
                    return;
                }
                if (data.sender === 'system') {
                    // one's own join announcement round-trips too; hide it
                    if (evt.event === 'user_joined' && data.message.indexOf(username) !== -1) return;
                    line(data.message, true);
                    return;
                }
                const who = data.sender === username ? 'You' : data.sender;
                line('<' + who + '>: ' + data.message);
            };

            // Handlers die with the socket object, so each reconnect binds a
            // fresh set and stale ones cannot double-deliver.
            ws.onclose = function() {
                line('Disconnected, retrying...', true);
                setTimeout(connect, RECONNECT_DELAY_MS);
            };
        }

        document.getElementById('compose').onsubmit = function(e) {
            e.preventDefault();
            const body = text.value.trim();
            text.value = '';
            if (!body || !ws || ws.readyState !== WebSocket.OPEN) return;
            emit('message', { room: room, message: body, sender: username });
        };

        connect();
        </script>
    </body>
</html>
"#;

// GET /{room: str} -> chat page for that room
fn room_page() -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!(String).map(|_| warp::reply::html(CHAT_PAGE))
}

fn with_relay(
    relay: Arc<RoomRelay>,
) -> impl warp::Filter<Extract = (Arc<RoomRelay>,), Error = Infallible> + Clone {
    warp::any().map(move || relay.clone())
}

// GET /chat -> websocket upgrade; the room is conveyed by the join intent,
// not the path
fn ws_upgrade(
    relay: Arc<RoomRelay>,
    ping_interval: Duration,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("chat")
        .and(warp::ws())
        .and(with_relay(relay))
        .map(move |ws: warp::ws::Ws, relay: Arc<RoomRelay>| {
            // This will call our function if the handshake succeeds.
            ws.on_upgrade(move |socket| session::client_connected(socket, relay, ping_interval))
        })
}

/// The upgrade filter goes first so a websocket handshake wins the `/chat`
/// segment over the catch-all page route.
pub fn build_filters(
    relay: Arc<RoomRelay>,
    ping_interval: Duration,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    ws_upgrade(relay, ping_interval).or(room_page())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{build_filters, room_page, ws_upgrade, CHAT_PAGE};
    use crate::protocol::{Reject, ServerEvent};
    use crate::relay::RoomRelay;

    const PING: Duration = Duration::from_secs(30);

    async fn recv_event(client: &mut warp::test::WsClient) -> ServerEvent {
        let msg = client.recv().await.expect("websocket closed");
        serde_json::from_str(msg.to_str().expect("text frame")).expect("valid event json")
    }

    #[tokio::test]
    async fn chat_page_endpoint() {
        let filter = room_page();
        let ok_reply = warp::test::request()
            .path("/123456")
            .reply(&filter)
            .await;

        assert_eq!(ok_reply.status(), 200);
        assert_eq!(ok_reply.body(), CHAT_PAGE);

        let no_room_provided = warp::test::request().path("/").reply(&filter).await;
        assert_eq!(no_room_provided.status(), 404);

        let too_many_segments = warp::test::request()
            .path("/123/456")
            .reply(&filter)
            .await;
        assert_eq!(too_many_segments.status(), 404);
    }

    #[tokio::test]
    async fn chat_upgrade_endpoint() {
        let relay = Arc::new(RoomRelay::new());
        let filter = ws_upgrade(relay.clone(), PING);

        let ok_reply = warp::test::ws().path("/chat").handshake(filter).await;
        assert!(ok_reply.is_ok());

        // Fail test
        let filter = ws_upgrade(relay, PING);
        let wrong_path = warp::test::ws().path("/elsewhere").handshake(filter).await;
        assert!(wrong_path.is_err());
    }

    #[tokio::test]
    async fn join_and_message_round_trip() {
        let relay = Arc::new(RoomRelay::new());
        let filter = build_filters(relay, PING);

        let mut alice = warp::test::ws()
            .path("/chat")
            .handshake(filter.clone())
            .await
            .expect("alice handshake");
        alice
            .send_text(r#"{"event":"join-room","data":{"room":"123456","username":"alice"}}"#)
            .await;
        assert_eq!(recv_event(&mut alice).await, ServerEvent::joined("alice"));

        let mut bob = warp::test::ws()
            .path("/chat")
            .handshake(filter.clone())
            .await
            .expect("bob handshake");
        bob.send_text(r#"{"event":"join-room","data":{"room":"123456","username":"bob"}}"#)
            .await;
        assert_eq!(recv_event(&mut bob).await, ServerEvent::joined("bob"));
        assert_eq!(recv_event(&mut alice).await, ServerEvent::joined("bob"));

        alice
            .send_text(r#"{"event":"message","data":{"room":"123456","message":"hi","sender":"alice"}}"#)
            .await;
        let expected = ServerEvent::Message {
            sender: "alice".to_owned(),
            message: "hi".to_owned(),
        };
        assert_eq!(recv_event(&mut alice).await, expected);
        assert_eq!(recv_event(&mut bob).await, expected);
    }

    #[tokio::test]
    async fn malformed_intents_are_answered_not_dropped() {
        let relay = Arc::new(RoomRelay::new());
        let filter = build_filters(relay, PING);

        let mut client = warp::test::ws()
            .path("/chat")
            .handshake(filter)
            .await
            .expect("handshake");
        client.send_text("definitely not an intent").await;
        assert_eq!(
            recv_event(&mut client).await,
            ServerEvent::Rejected {
                reason: Reject::Malformed
            }
        );
    }
}
