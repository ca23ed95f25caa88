mod softmax_ce;

pub use softmax_ce::SoftmaxCrossEntropy;
