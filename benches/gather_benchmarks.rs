use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use exec_gather::{
    new_parser, Accumulator, CommandRunner, ExecCollector, ExecConfig, ParserConfig, Result,
};
use std::sync::Arc;

/// Runner that answers every command with the same output.
struct ConstRunner(Vec<u8>);

#[async_trait]
impl CommandRunner for ConstRunner {
    async fn run(&self, _command_line: &str) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// Benchmark each built-in parser on typical command output
fn bench_parsers(c: &mut Criterion) {
    let json = br#"{"cpu":{"user":12.5,"system":3.1,"idle":84.4},"load":0.42,"host":"web01"}"#.to_vec();
    let influx = (0..100)
        .map(|i| format!("cpu,host=web{:02} usage={}.5,cores=4i {}\n", i, i, 1_700_000_000_000_000_000i64 + i))
        .collect::<String>()
        .into_bytes();
    let graphite = (0..100)
        .map(|i| format!("servers.web{:02}.cpu.idle {}.5 1700000000\n", i, i))
        .collect::<String>()
        .into_bytes();

    let cases = [
        ("json", ParserConfig::new("json").with_metric_name("exec").with_tag_keys(vec!["host".to_string()]), json),
        ("influx", ParserConfig::new("influx"), influx),
        (
            "graphite",
            ParserConfig::new("graphite").with_templates(vec!["servers.* .host.measurement.field".to_string()]),
            graphite,
        ),
    ];

    for (name, config, input) in cases {
        let parser = new_parser(&config).expect("Should build parser");
        c.bench_with_input(BenchmarkId::new("parse", name), &input, |b, input| {
            b.iter(|| parser.parse(input).expect("Should parse"))
        });
    }
}

/// Benchmark a full collection cycle with a growing number of commands
fn bench_gather(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    for commands in [1usize, 8, 64].iter() {
        let config = ExecConfig::new((0..*commands).map(|i| format!("collector-{}", i)))
            .with_data_format("influx");
        let collector = ExecCollector::new(config)
            .with_runner(Arc::new(ConstRunner(b"mem free=10i,used=2i\n".to_vec())));

        c.bench_with_input(BenchmarkId::new("gather", commands), commands, |b, _| {
            b.to_async(&rt).iter(|| async {
                let acc = Arc::new(Accumulator::new());
                collector.gather(acc.clone()).await.expect("Should gather");
                acc.len()
            })
        });
    }
}

criterion_group!(benches, bench_parsers, bench_gather);
criterion_main!(benches);
