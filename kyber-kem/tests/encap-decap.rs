use kyber_kem::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rstest::*;

#[rstest]
#[case::kyber512(Algorithm::Kyber512)]
#[case::kyber768(Algorithm::Kyber768)]
#[case::kyber1024(Algorithm::Kyber1024)]
#[case::mlkem512(Algorithm::MlKem512)]
#[case::mlkem768(Algorithm::MlKem768)]
#[case::mlkem1024(Algorithm::MlKem1024)]
fn agreement(#[case] alg: Algorithm) {
    let mut rng = ChaCha8Rng::from_seed([1u8; 32]);
    for _ in 0..4 {
        let (pk, sk) = alg.generate_keypair(&mut rng).unwrap();
        assert_eq!(pk.value().len(), alg.public_key_length());
        assert_eq!(sk.value().len(), alg.secret_key_length());

        let (ct, ss_send) = pk.encapsulate_with_rng(&mut rng).unwrap();
        assert_eq!(ct.value().len(), alg.ciphertext_length());
        assert_eq!(ss_send.value().len(), 32);

        let ss_recv = sk.decapsulate(&ct).unwrap();
        assert_eq!(ss_send, ss_recv);
    }
}

#[rstest]
#[case::kyber512(Algorithm::Kyber512)]
#[case::kyber1024(Algorithm::Kyber1024)]
#[case::mlkem768(Algorithm::MlKem768)]
fn implicit_rejection(#[case] alg: Algorithm) {
    let mut rng = ChaCha8Rng::from_seed([2u8; 32]);
    let (pk, sk) = alg.generate_keypair(&mut rng).unwrap();
    let (ct, ss) = alg.encapsulate_with_rng(&pk, &mut rng).unwrap();

    let mut tampered = ct.value().to_vec();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x80;
    let tampered = Ciphertext::from_bytes(alg, &tampered).unwrap();

    let rejected = sk.decapsulate(&tampered).unwrap();
    assert_ne!(rejected, ss);
    // The same ciphertext is always rejected to the same secret
    assert_eq!(sk.decapsulate(&tampered).unwrap(), rejected);

    // A different corruption gives a different secret
    let mut other = ct.value().to_vec();
    other[0] ^= 0x01;
    let other = Ciphertext::from_bytes(alg, &other).unwrap();
    assert_ne!(sk.decapsulate(&other).unwrap(), rejected);

    // A different key rejects the same ciphertext differently
    let (_, sk2) = alg.generate_keypair(&mut rng).unwrap();
    assert_ne!(sk2.decapsulate(&tampered).unwrap(), rejected);
}

#[test]
fn wrong_key_does_not_agree() {
    let mut rng = ChaCha8Rng::from_seed([3u8; 32]);
    let alg = Algorithm::Kyber768;
    let (pk, _) = alg.generate_keypair(&mut rng).unwrap();
    let (_, sk_other) = alg.generate_keypair(&mut rng).unwrap();
    let (ct, ss) = pk.encapsulate_with_rng(&mut rng).unwrap();
    assert_ne!(sk_other.decapsulate(&ct).unwrap(), ss);
}

#[test]
fn length_validation() {
    let alg = Algorithm::Kyber512;
    assert_eq!(
        PublicKey::from_bytes(alg, [0u8; 799]).unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::PublicKey,
            expected: 800,
            actual: 799,
        }
    );
    assert_eq!(
        SecretKey::from_bytes(alg, vec![0u8; 1633]).unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::SecretKey,
            expected: 1632,
            actual: 1633,
        }
    );
    assert_eq!(
        Ciphertext::from_bytes(alg, [0u8; 0]).unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::Ciphertext,
            expected: 768,
            actual: 0,
        }
    );
    assert_eq!(
        SharedSecret::from_bytes(alg, [0u8; 31]).unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::SharedSecret,
            expected: 32,
            actual: 31,
        }
    );

    let err = Ciphertext::from_bytes(Algorithm::Kyber1024, [0u8; 1088]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid ciphertext length: expected 1568, got 1088"
    );
}

#[test]
fn operations_reject_malformed_inputs() {
    // Default values carry the default algorithm and no bytes
    let alg = Algorithm::default();
    let mut rng = ChaCha8Rng::from_seed([6u8; 32]);
    let (pk, sk) = alg.generate_keypair(&mut rng).unwrap();
    let (ct, _) = pk.encapsulate_with_rng(&mut rng).unwrap();

    assert_eq!(
        alg.encapsulate_with_rng(&PublicKey::default(), &mut rng)
            .unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::PublicKey,
            expected: 1184,
            actual: 0,
        }
    );
    assert_eq!(
        alg.decapsulate(&sk, &Ciphertext::default()).unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::Ciphertext,
            expected: 1088,
            actual: 0,
        }
    );
    assert_eq!(
        alg.decapsulate(&SecretKey::default(), &ct).unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::SecretKey,
            expected: 2400,
            actual: 0,
        }
    );
    assert_eq!(
        alg.encapsulate_deterministic(&PublicKey::default(), &[0u8; 32])
            .unwrap_err(),
        Error::InvalidInputLength {
            kind: InputKind::PublicKey,
            expected: 1184,
            actual: 0,
        }
    );
}

#[test]
fn mismatched_algorithms() {
    let mut rng = ChaCha8Rng::from_seed([4u8; 32]);
    let (pk512, sk512) = Algorithm::Kyber512.generate_keypair(&mut rng).unwrap();
    let (pk_ml, _) = Algorithm::MlKem512.generate_keypair(&mut rng).unwrap();

    // Same sizes, different transform
    assert_eq!(
        Algorithm::MlKem512
            .encapsulate_with_rng(&pk512, &mut rng)
            .unwrap_err(),
        Error::InvalidParameterSet
    );

    let (ct_ml, _) = pk_ml.encapsulate_with_rng(&mut rng).unwrap();
    assert_eq!(
        sk512.decapsulate(&ct_ml).unwrap_err(),
        Error::InvalidParameterSet
    );
}

struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy source is empty"))
    }
}

impl rand::CryptoRng for FailingRng {}

#[test]
fn randomness_failure_is_reported() {
    for &alg in Algorithm::all() {
        assert_eq!(
            alg.generate_keypair(FailingRng).unwrap_err(),
            Error::RandomnessUnavailable
        );

        let (pk, _) = alg.generate_keypair_from_seed(&[0u8; 64]);
        assert_eq!(
            pk.encapsulate_with_rng(FailingRng).unwrap_err(),
            Error::RandomnessUnavailable
        );
    }
}

#[test]
fn names_round_trip() {
    for &alg in Algorithm::all() {
        assert_eq!(alg.to_string().parse::<Algorithm>().unwrap(), alg);
        assert_eq!(Algorithm::try_from(u8::from(alg)).unwrap(), alg);
    }
    assert_eq!(Algorithm::default(), Algorithm::Kyber768);
    assert_eq!(
        "Kyber-768".parse::<Algorithm>().unwrap_err(),
        Error::InvalidParameterSet
    );
}

#[test]
fn claimed_levels() {
    assert_eq!(Algorithm::Kyber512.claimed_nist_level(), 1);
    assert_eq!(Algorithm::Kyber768.claimed_nist_level(), 3);
    assert_eq!(Algorithm::MlKem1024.claimed_nist_level(), 5);
}

#[test]
fn deterministic_encapsulation_matches_decapsulation() {
    let mut rng = ChaCha8Rng::from_seed([5u8; 32]);
    for &alg in Algorithm::all() {
        let mut seed = [0u8; 64];
        rng.fill_bytes(&mut seed);
        let mut m = [0u8; 32];
        rng.fill_bytes(&mut m);

        let (pk, sk) = alg.generate_keypair_from_seed(&seed);
        let (ct, ss) = alg.encapsulate_deterministic(&pk, &m).unwrap();
        assert_eq!(alg.decapsulate(&sk, &ct).unwrap(), ss);

        let (ct2, ss2) = alg.encapsulate_deterministic(&pk, &m).unwrap();
        assert_eq!(ct, ct2);
        assert_eq!(ss, ss2);
    }
}

#[cfg(feature = "serde")]
macro_rules! serde_test {
    ($name:ident, $ser:path, $de:path) => {
        #[rstest]
        #[case::kyber512(Algorithm::Kyber512)]
        #[case::kyber768(Algorithm::Kyber768)]
        #[case::kyber1024(Algorithm::Kyber1024)]
        #[case::mlkem512(Algorithm::MlKem512)]
        #[case::mlkem768(Algorithm::MlKem768)]
        #[case::mlkem1024(Algorithm::MlKem1024)]
        fn $name(#[case] alg: Algorithm) {
            let mut rng = ChaCha8Rng::from_seed([3u8; 32]);
            let (pk, sk) = alg.generate_keypair(&mut rng).unwrap();
            let (ct, ss) = alg.encapsulate_with_rng(&pk, &mut rng).unwrap();

            let pk_str = $ser(&pk).unwrap();
            let sk_str = $ser(&sk).unwrap();
            let ct_str = $ser(&ct).unwrap();
            let ss_str = $ser(&ss).unwrap();

            let pk2: PublicKey = $de(&pk_str).unwrap();
            let sk2: SecretKey = $de(&sk_str).unwrap();
            let ct2: Ciphertext = $de(&ct_str).unwrap();
            let ss2: SharedSecret = $de(&ss_str).unwrap();

            assert_eq!(pk, pk2);
            assert_eq!(sk, sk2);
            assert_eq!(ct, ct2);
            assert_eq!(ss, ss2);
            assert_eq!(sk2.decapsulate(&ct2).unwrap(), ss);
        }
    };
}

#[cfg(feature = "serde")]
serde_test!(serialization_json, serde_json::to_string, serde_json::from_str);
#[cfg(feature = "serde")]
serde_test!(serialization_postcard, postcard::to_stdvec, postcard::from_bytes);
