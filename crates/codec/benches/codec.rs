use bytes::BytesMut;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rtp_session_codec::{
    rtcp::{
        self, Compound,
        report::{ReportBlock, Sr},
        sdes::{Chunk, Item, ItemKind, Sdes},
    },
    rtp,
};

fn criterion_benchmark(c: &mut Criterion) {
    let mut rtp_bytes = BytesMut::new();
    let mut header = rtp::Header::new(26, 0x79266955);
    header.sequence_number = 1265;
    header.timestamp = 4169613229;
    rtp::Packet {
        header,
        payload: vec![0xAB; 1024],
    }
    .encode(&mut rtp_bytes);

    let mut rtcp_bytes = BytesMut::new();
    rtcp::Packet::Sr(Sr {
        ssrc: 0x79266955,
        ntp_time: 0xe8e2e217_d42f0591,
        rtp_time: 0x3601b0af,
        packet_count: 1000,
        octet_count: 800_000,
        reports: vec![ReportBlock::default(); 4],
    })
    .encode(&mut rtcp_bytes);
    rtcp::Packet::Sdes(Sdes {
        chunks: vec![Chunk {
            ssrc: 0x79266955,
            items: vec![Item {
                kind: ItemKind::Cname,
                text: "receiver@host".to_string(),
            }],
        }],
    })
    .encode(&mut rtcp_bytes);

    let mut group = c.benchmark_group("codec");

    group.throughput(Throughput::Elements(1));
    group.bench_function("decode_rtp", |bencher| {
        bencher.iter(|| {
            rtp::Packet::decode(&rtp_bytes[..]).unwrap();
        })
    });

    group.bench_function("decode_rtcp_compound", |bencher| {
        bencher.iter(|| {
            Compound::new(&rtcp_bytes[..])
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
