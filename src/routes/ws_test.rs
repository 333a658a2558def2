use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::counter::CounterStore;
use crate::routes::spawn_test_server;
use crate::services::chat_room::{CreateChatRoomDto, create_chat_room};
use crate::services::room_store::RoomStore;
use crate::state::test_helpers::{TestHarness, class_info, test_harness, user};

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn setup_room() -> (TestHarness, SocketAddr, i64) {
    let h = test_harness();
    h.users
        .add_user("teacher-token", "teacher-key", user(1, 'T', "김선생"));
    h.users
        .add_user("mother-token", "mother-key", user(2, 'F', "박엄마"));
    h.users
        .add_user("stranger-token", "stranger-key", user(3, 'S', "최학생"));
    h.users.add_child(7, 2, "이예리");
    h.schools.add_class(class_info(7, "1학년 3반 "));

    let dto = CreateChatRoomDto {
        login_user_token: "teacher-token".into(),
        opponent_user_key: "mother-key".into(),
        school_class_id: 7,
    };
    let room = create_chat_room(&h.state, &dto).await.unwrap();
    let addr = spawn_test_server(h.state.clone()).await;
    (h, addr, room.room_id)
}

async fn connect(addr: SocketAddr, room_id: i64, token: &str) -> Client {
    let url = format!("ws://{addr}/chat-service/ws/{room_id}?token={token}");
    let (client, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("ws connect");
    client
}

async fn recv_text(client: &mut Client) -> String {
    loop {
        let msg = timeout(Duration::from_millis(500), client.next())
            .await
            .expect("ws receive timed out")
            .expect("ws stream ended")
            .expect("ws error");
        if let WsMessage::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

/// Poll until `check` holds; the server side updates asynchronously.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn connect_counts_participants_and_relays_text() {
    let (harness, addr, room_id) = setup_room().await;
    let h = &harness;

    let mut teacher = connect(addr, room_id, "teacher-token").await;
    let mut mother = connect(addr, room_id, "mother-token").await;
    assert_eq!(h.counter.get(room_id).await.unwrap(), 2);

    // The mother's socket may still be registering for relay.
    eventually(move || async move { h.state.live_rooms.read().await.get(&room_id).map_or(0, |c| c.len()) == 2 }).await;

    teacher
        .send(WsMessage::Text("안녕하세요".into()))
        .await
        .unwrap();
    assert_eq!(recv_text(&mut mother).await, "안녕하세요");

    let mother_view = h
        .rooms
        .find_membership(room_id, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mother_view.unread_count, 0);

    teacher.close(None).await.unwrap();
    eventually(move || async move { h.counter.get(room_id).await.unwrap() == 1 }).await;
    drop(mother);
    eventually(move || async move { h.counter.get(room_id).await.unwrap() == 0 }).await;
}

#[tokio::test]
async fn message_while_alone_bumps_unread() {
    let (harness, addr, room_id) = setup_room().await;
    let h = &harness;
    h.rooms.set_unread(room_id, 1, 3);

    let mut teacher = connect(addr, room_id, "teacher-token").await;
    let teacher_view = h
        .rooms
        .find_membership(room_id, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(teacher_view.unread_count, 0);

    teacher
        .send(WsMessage::Text("내일 상담 가능하신가요?".into()))
        .await
        .unwrap();

    eventually(move || async move {
        h.rooms
            .find_membership(room_id, 2)
            .await
            .unwrap()
            .is_some_and(|m| m.unread_count == 1)
    })
    .await;
}

#[tokio::test]
async fn second_tab_of_sender_does_not_hide_absent_member() {
    let (harness, addr, room_id) = setup_room().await;
    let h = &harness;

    let mut first_tab = connect(addr, room_id, "teacher-token").await;
    let mut second_tab = connect(addr, room_id, "teacher-token").await;
    assert_eq!(h.counter.get(room_id).await.unwrap(), 2);
    eventually(move || async move { h.state.live_rooms.read().await.get(&room_id).map_or(0, |c| c.len()) == 2 }).await;

    first_tab
        .send(WsMessage::Text("알림장 확인 부탁드립니다.".into()))
        .await
        .unwrap();
    assert_eq!(recv_text(&mut second_tab).await, "알림장 확인 부탁드립니다.");

    eventually(move || async move {
        h.rooms
            .find_membership(room_id, 2)
            .await
            .unwrap()
            .is_some_and(|m| m.unread_count == 1)
    })
    .await;
}

#[tokio::test]
async fn non_member_is_rejected_before_upgrade() {
    let (h, addr, room_id) = setup_room().await;
    let url = format!("ws://{addr}/chat-service/ws/{room_id}?token=stranger-token");
    let err = tokio_tungstenite::connect_async(url).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => assert_eq!(response.status().as_u16(), 404),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
    assert_eq!(h.counter.get(room_id).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_or_unknown_token_is_rejected() {
    let (_h, addr, room_id) = setup_room().await;
    for url in [
        format!("ws://{addr}/chat-service/ws/{room_id}"),
        format!("ws://{addr}/chat-service/ws/{room_id}?token=bogus"),
    ] {
        let err = tokio_tungstenite::connect_async(url).await.unwrap_err();
        match err {
            tokio_tungstenite::tungstenite::Error::Http(response) => assert_eq!(response.status().as_u16(), 401),
            other => panic!("expected HTTP rejection, got {other:?}"),
        }
    }
}
