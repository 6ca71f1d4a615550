use criterion::{Criterion, criterion_group, criterion_main};
use speedtest::Identity;
use speedtest::geo::distance_km;
use speedtest::speedtest_net::parse_servers;
use std::hint::black_box;

fn server_list_json(count: usize) -> String {
    let entries: Vec<String> = (0..count)
        .map(|i| {
            let lat = -60.0 + (i as f64 * 7.3) % 120.0;
            let lon = -170.0 + (i as f64 * 13.7) % 340.0;
            format!(
                r#"{{"url":"http://s{i}.example.net/speedtest/upload.php","lat":"{lat}","lon":"{lon}","name":"Server {i}","country":"Somewhere","sponsor":"Sponsor {i}","id":"{i}","host":"s{i}.example.net"}}"#
            )
        })
        .collect();
    format!("[{}]", entries.join(","))
}

fn distance_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance");

    group.bench_function("haversine", |b| {
        b.iter(|| {
            black_box(distance_km(
                black_box(51.5074),
                black_box(-0.1278),
                black_box(40.7128),
                black_box(-74.0060),
            ))
        })
    });

    group.finish();
}

fn server_list_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("server_list");
    let identity = Identity {
        ip: "203.0.113.7".to_string(),
        isp: "Example Broadband".to_string(),
        lat: 51.5074,
        lon: -0.1278,
    };

    for count in [10, 100] {
        let json = server_list_json(count);
        group.bench_function(format!("parse_and_sort_{count}"), |b| {
            b.iter(|| black_box(parse_servers(black_box(&json), &identity).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, distance_benchmark, server_list_benchmark);
criterion_main!(benches);
