macro_rules! expand {
    ($m: ident, $ty: ident) => {
        $m!{$ty}
    };
    ($m: ident, $ty: ident, $($tt: ident),*) => {
        $m!{$ty, $($tt),*}
        expand!{$m, $($tt),*}
    };
}

macro_rules! impl_for_tuples {
    ($m: ident) => {
        expand!($m, L, K, J, I, H, G, F, E, D, C, B, A);
    };
}
