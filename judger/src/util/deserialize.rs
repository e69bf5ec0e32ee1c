use serde::{
    de::{self, IntoDeserializer, MapAccess, Visitor},
    Deserialize, Deserializer,
};
use std::{fmt, marker::PhantomData};

/// Deserialize a single item or an array, like `"javascript"` or
/// `["javascript"]`, into a collection.
pub fn single_or_array<'de, TArr, TItem, D>(deserializer: D) -> Result<TArr, D::Error>
where
    TArr: Deserialize<'de> + Default + Extend<TItem>,
    TItem: Deserialize<'de>,
    D: Deserializer<'de>,
{
    fn create_t_arr<TArr, TItem>(item: TItem) -> TArr
    where
        TArr: Default + Extend<TItem>,
    {
        let mut arr = TArr::default();
        arr.extend([item]);
        arr
    }

    struct SingleOrArray<TArr, TItem>(PhantomData<fn() -> (TArr, TItem)>);

    impl<'de, TArr, TItem> Visitor<'de> for SingleOrArray<TArr, TItem>
    where
        TArr: Deserialize<'de> + Default + Extend<TItem>,
        TItem: Deserialize<'de>,
    {
        type Value = TArr;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a single item or an array of items")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            TItem::deserialize(v.into_deserializer()).map(create_t_arr)
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            TItem::deserialize(v.into_deserializer()).map(create_t_arr)
        }

        fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            TArr::deserialize(de::value::SeqAccessDeserializer::new(seq))
        }

        fn visit_map<M>(self, map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            Ok(create_t_arr(TItem::deserialize(
                de::value::MapAccessDeserializer::new(map),
            )?))
        }
    }

    deserializer.deserialize_any(SingleOrArray(PhantomData))
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Lang {
        Javascript,
        Python,
    }

    #[derive(Deserialize, Debug)]
    struct Holder {
        #[serde(deserialize_with = "super::single_or_array")]
        langs: Vec<Lang>,
    }

    #[test]
    fn accepts_single_value_and_array() {
        let one: Holder = serde_json::from_str(r#"{"langs": "javascript"}"#).unwrap();
        assert_eq!(one.langs, vec![Lang::Javascript]);

        let many: Holder = toml::from_str(r#"langs = ["javascript", "python"]"#).unwrap();
        assert_eq!(many.langs, vec![Lang::Javascript, Lang::Python]);
    }
}
