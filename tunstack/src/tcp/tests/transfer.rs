use super::common::{TcpTestUnit, CLIENT_ISS, SERVER_ISS, WIN};
use types::tcp::TcpPacket;

#[test]
fn data_then_fin_accounts_for_both_virtual_bytes() {
    let mut client = TcpTestUnit::client();
    let mut server = TcpTestUnit::server();
    client.handshake_pipe(&mut server);

    assert_eq!(client.con.write(b"hello"), 5);
    client.con.end_input_stream();

    let mut fin = TcpPacket::new(80, 1808, CLIENT_ISS + 6, SERVER_ISS + 1, WIN, Vec::new());
    fin.flags.fin = true;
    client.assert_outgoing(|out| {
        assert_eq!(
            out,
            vec![
                TcpPacket::new(
                    80,
                    1808,
                    CLIENT_ISS + 1,
                    SERVER_ISS + 1,
                    WIN,
                    b"hello".to_vec()
                ),
                fin,
            ]
        );
        for pkt in out {
            server.incoming(pkt);
        }
    });

    // the server saw the whole stream
    assert_eq!(server.con.inbound_stream().read(16), b"hello");
    assert!(server.con.inbound_stream().input_ended());

    // the server acked data and FIN; pass its answers back
    server.pipe(&mut client, 2);
    assert_eq!(client.con.bytes_in_flight(), 0);
}

#[test]
fn receiver_acks_data_as_it_arrives() {
    let mut client = TcpTestUnit::client();
    let mut server = TcpTestUnit::server();
    client.handshake_pipe(&mut server);

    client.con.write(b"hello");
    client.pipe(&mut server, 1);

    // the buffered bytes shrink the advertised window
    server.assert_outgoing_eq(&[TcpPacket::new(
        1808,
        80,
        SERVER_ISS + 1,
        CLIENT_ISS + 6,
        WIN - 5,
        Vec::new(),
    )]);
}

#[test]
fn out_of_order_segments_are_held_back() {
    let mut client = TcpTestUnit::client();
    let mut server = TcpTestUnit::server();
    client.handshake_pipe(&mut server);

    // "world" leaves second but arrives first
    client.con.write(b"hello");
    client.con.write(b"world");
    client.assert_outgoing(|out| {
        assert_eq!(out.len(), 2);
        server.incoming(out[1].clone());
        assert_eq!(server.con.unassembled_bytes(), 5);
        assert!(server.con.inbound_stream().is_empty());

        server.incoming(out[0].clone());
        assert_eq!(server.con.unassembled_bytes(), 0);
    });

    assert_eq!(server.con.inbound_stream().read(16), b"helloworld");
}

#[test]
fn keep_alive_probe_gets_a_fresh_ack() {
    let mut client = TcpTestUnit::client();
    let mut server = TcpTestUnit::server();
    client.handshake_pipe(&mut server);

    // a zero-length segment one slot below the ackno
    server.incoming(TcpPacket::new(80, 1808, CLIENT_ISS, SERVER_ISS + 1, WIN, Vec::new()));
    server.assert_outgoing_eq(&[TcpPacket::new(
        1808,
        80,
        SERVER_ISS + 1,
        CLIENT_ISS + 1,
        WIN,
        Vec::new(),
    )]);
}

#[test]
fn duplicate_data_does_not_reach_the_stream_twice() {
    let mut client = TcpTestUnit::client();
    let mut server = TcpTestUnit::server();
    client.handshake_pipe(&mut server);

    client.con.write(b"once");
    client.assert_outgoing(|out| {
        server.incoming(out[0].clone());
        server.incoming(out[0].clone());
    });

    assert_eq!(server.con.inbound_stream().read(16), b"once");
    assert!(server.con.inbound_stream().is_empty());
}
