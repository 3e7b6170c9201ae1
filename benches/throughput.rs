use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use fmac_proto::{TotpGenerator, TriggerCodec};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_ASN1,
    ECDSA_P256_SHA256_ASN1_SIGNING,
};
use tokio_util::codec::Decoder;

// Per-attempt admission cost: code generation, frame decoding and the
// signature check that dominates it.

fn totp_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("totp");
    group.throughput(Throughput::Elements(1));

    let totp = TotpGenerator::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
    group.bench_function("generate", |b| {
        let mut t = 1_234_567_890u64;
        b.iter(|| {
            t += 30;
            totp.generate(t)
        })
    });

    group.finish();
}

fn trigger_frame_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigger");
    let mut frame = vec![0x00, 0x48];
    frame.extend_from_slice(&[0x30; 72]);
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("decode_frame", |b| {
        let mut codec = TriggerCodec::new();
        b.iter(|| {
            let mut buf = BytesMut::from(frame.as_slice());
            codec.decode(&mut buf).unwrap().unwrap()
        })
    });

    group.finish();
}

fn signature_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");
    group.throughput(Throughput::Elements(1));

    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
    let pair =
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap();
    let message = fmac_proto::totp::challenge_message(5924);
    let signature = pair.sign(&rng, message.as_bytes()).unwrap();
    let key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, pair.public_key().as_ref().to_vec());

    group.bench_function("verify_p256", |b| {
        b.iter(|| key.verify(message.as_bytes(), signature.as_ref()).is_ok())
    });

    group.finish();
}

criterion_group!(benches, totp_benchmark, trigger_frame_benchmark, signature_benchmark);
criterion_main!(benches);
